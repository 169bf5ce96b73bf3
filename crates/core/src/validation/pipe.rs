//! The validation pipe: raw payload in, typed request or violations out.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::schema::Schema;
use crate::error::CoreError;

/// A request type that can be validated from an untyped payload.
pub trait RequestSchema: DeserializeOwned {
    /// The schema describing this request's wire shape.
    fn schema() -> Schema;
}

/// Turns an untyped payload into a validated value.
pub trait Validator {
    type Output;

    /// Coerce and check `payload`.
    ///
    /// Fails with [`CoreError::Validation`] carrying every violation found.
    fn transform(&self, payload: Value) -> Result<Self::Output, CoreError>;
}

/// Validation pipe bound to one request type.
#[derive(Debug, Clone)]
pub struct ValidationPipe<T> {
    schema: Schema,
    _request: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> ValidationPipe<T> {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            _request: PhantomData,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// Build the pipe for `T` from its declared schema.
pub fn validation_pipe<T: RequestSchema>() -> ValidationPipe<T> {
    ValidationPipe::new(T::schema())
}

impl<T: DeserializeOwned> Validator for ValidationPipe<T> {
    type Output = T;

    fn transform(&self, payload: Value) -> Result<T, CoreError> {
        let request = std::any::type_name::<T>();
        tracing::debug!(
            request,
            payload = %self.schema.redact(&payload),
            "Request data"
        );

        let coerced = match self.schema.evaluate(&payload) {
            Ok(coerced) => coerced,
            Err(violations) => {
                tracing::info!(request, errors = ?violations, "Request validation failed");
                return Err(CoreError::Validation(violations));
            }
        };

        serde_json::from_value(Value::Object(coerced)).map_err(|e| {
            tracing::error!(request, error = %e, "Validated payload does not match request type");
            CoreError::Internal(format!("Schema mismatch for {request}: {e}"))
        })
    }
}
