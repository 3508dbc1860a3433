use axum::extract::FromRequest;

use crate::error::Error;

/// `axum::Json` whose rejections (syntax, wrong types, missing fields, wrong
/// content type) come back as `Error::Validation` with the usual JSON body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct JsonBody<T>(pub T);
