use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ngd_api::ErrorPayload;
use serde_json::Value;

/// Renders a payload as a JSON response, with its `code` as the HTTP
/// status.
pub(crate) fn payload_response(payload: ErrorPayload) -> Response {
    let status =
        StatusCode::from_u16(payload.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(payload)).into_response()
}

/// Fills the supported-parameter placeholder the unsupported-parameter
/// rewrite leaves behind, with this route's own parameter list.
pub(crate) fn fill_supported_params(payload: &mut ErrorPayload, supported: &[&str]) {
    if let Value::String(description) = &mut payload.description {
        if description.contains("{attr}") {
            *description = description.replace("{attr}", &supported.join(", "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fill_supported_params;
    use ngd_api::{ERROR_SOURCE_UPSTREAM, ErrorPayload};

    #[test]
    fn the_placeholder_becomes_the_route_parameter_list() {
        let mut payload = ErrorPayload::new(
            400,
            "Not supported query parameter. Additional supported wrapper parameters for \
             this function are: {attr}.",
            ERROR_SOURCE_UPSTREAM,
        );
        fill_supported_params(&mut payload, &["wkt", "use-latest-collection"]);
        assert!(
            payload
                .description
                .as_str()
                .unwrap()
                .ends_with("are: wkt, use-latest-collection.")
        );
    }

    #[test]
    fn descriptions_without_the_placeholder_are_untouched() {
        let mut payload = ErrorPayload::new(400, "plain", ERROR_SOURCE_UPSTREAM);
        fill_supported_params(&mut payload, &["wkt"]);
        assert_eq!(payload.description, "plain");
    }
}
