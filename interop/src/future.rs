use std::{future::Future, pin::Pin};

/// A boxed `Send` future, returned by the object-safe traits of this crate
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
