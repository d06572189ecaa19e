use bytes::Bytes;

use crate::error::FetchError;

/// Turns a coordinate into image bytes.
///
/// Implementations own their request settings (zoom, size, style, credential, timeout).
pub trait ImageSource: Send + Sync {
    fn fetch(&self, lat: f64, lon: f64) -> Result<Bytes, FetchError>;
}

impl<T: ImageSource + ?Sized> ImageSource for Box<T> {
    fn fetch(&self, lat: f64, lon: f64) -> Result<Bytes, FetchError> {
        (**self).fetch(lat, lon)
    }
}
