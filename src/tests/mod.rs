//! tests/mod.rs
//! Pruebas del servicio de campañas (dispatch, ledger, resolver).
mod dispatch_tests;
mod support;
