//! HTTP request handlers

pub mod agrifield;
pub mod auth;
pub mod health;
pub mod irrigation_log;
pub mod pages;
pub mod performance;
pub mod profile;
pub mod timeseries;

pub use agrifield::*;
pub use auth::*;
pub use health::*;
pub use irrigation_log::*;
pub use pages::*;
pub use performance::*;
pub use profile::*;
pub use timeseries::*;

use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};

use crate::error::{AppError, AppResult};

/// File download response with `Content-Disposition: attachment`
pub(crate) fn attachment(content_type: &'static str, file_name: &str, body: Vec<u8>) -> AppResult<Response> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name))
        .map_err(|_| AppError::Internal(format!("Unrepresentable file name: {:?}", file_name)))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_headers() {
        let response = attachment("text/csv", "abc-performance.csv", b"Date\r\n".to_vec()).unwrap();
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/csv");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"abc-performance.csv\""
        );
    }

    #[test]
    fn test_attachment_rejects_control_characters() {
        assert!(attachment("text/csv", "bad\nname.csv", Vec::new()).is_err());
    }
}
