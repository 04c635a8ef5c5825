//! Resource handles, one module per Instana object kind.

pub mod api_token;
pub mod custom_event_specification;
pub mod rbac_group;
pub mod rbac_role;
pub mod rbac_team;
pub mod sli_config;
pub mod slo_config;
pub mod slo_correction_config;
pub mod website_monitoring_config;

pub use api_token::{ApiTokenModel, ApiTokenResource};
pub use custom_event_specification::{CustomEventSpecificationModel, CustomEventSpecificationResource};
pub use rbac_group::{GroupModel, GroupResource};
pub use rbac_role::{RoleModel, RoleResource};
pub use rbac_team::{TeamModel, TeamResource};
pub use sli_config::{SliConfigModel, SliConfigResource};
pub use slo_config::{SloConfigModel, SloConfigResource};
pub use slo_correction_config::{SloCorrectionConfigModel, SloCorrectionConfigResource};
pub use website_monitoring_config::{WebsiteMonitoringConfigModel, WebsiteMonitoringConfigResource};

use crate::schema::{Diagnostic, Diagnostics};
use crate::tagfilter::{TagFilter, TagFilterMapper};

/// Prefix of every resource type name exposed to the host.
pub const RESOURCE_TYPE_PREFIX: &str = "instana_";

/// Full resource type name, e.g. `instana_rbac_role`.
pub fn resource_type_name(resource_name: &str) -> String {
    format!("{}{}", RESOURCE_TYPE_PREFIX, resource_name)
}

pub(crate) fn non_empty_string(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

pub(crate) fn non_empty_vec<T>(values: Vec<T>) -> Option<Vec<T>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

pub(crate) fn unsupported(
    summary: impl Into<String>,
    detail: impl Into<String>,
    attribute: &str,
) -> Diagnostics {
    Diagnostic::error(summary)
        .with_detail(detail)
        .with_attribute(attribute)
        .into()
}

/// Parse the expression stored at `attribute`. `None` and blank strings yield `None`.
pub(crate) fn parse_tag_filter(
    mapper: &dyn TagFilterMapper,
    expression: Option<&str>,
    attribute: &str,
) -> Result<Option<TagFilter>, Diagnostics> {
    match expression.map(str::trim) {
        None | Some("") => Ok(None),
        Some(expression) => mapper.parse(expression).map(Some).map_err(|err| {
            unsupported(
                "Failed to parse tag filter expression",
                err.to_string(),
                attribute,
            )
        }),
    }
}

/// Render an API tag filter for state.
pub(crate) fn normalize_tag_filter(
    mapper: &dyn TagFilterMapper,
    filter: Option<&TagFilter>,
    attribute: &str,
) -> Result<Option<String>, Diagnostics> {
    match filter {
        None => Ok(None),
        Some(filter) => mapper.to_normalized_string(filter).map_err(|err| {
            unsupported(
                "Failed to map tag filter expression",
                err.to_string(),
                attribute,
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagfilter::JsonTagFilterMapper;

    #[test]
    fn test_resource_type_name() {
        assert_eq!(resource_type_name("rbac_role"), "instana_rbac_role");
    }

    #[test]
    fn test_empty_helpers() {
        assert_eq!(non_empty_string(""), None);
        assert_eq!(non_empty_string("x"), Some("x".to_string()));
        assert_eq!(non_empty_vec::<String>(vec![]), None);
        assert_eq!(non_empty_vec(vec![1]), Some(vec![1]));
    }

    #[test]
    fn test_parse_tag_filter_blank_is_none() {
        let mapper = JsonTagFilterMapper;
        assert_eq!(parse_tag_filter(&mapper, None, "f").unwrap(), None);
        assert_eq!(parse_tag_filter(&mapper, Some("  "), "f").unwrap(), None);
    }

    #[test]
    fn test_parse_tag_filter_error_carries_attribute() {
        let mapper = JsonTagFilterMapper;
        let diags = parse_tag_filter(&mapper, Some("entity.type EQUALS"), "entity.filter").unwrap_err();
        assert_eq!(diags[0].summary, "Failed to parse tag filter expression");
        assert_eq!(diags[0].attribute.as_deref(), Some("entity.filter"));
    }

    #[test]
    fn test_normalize_tag_filter() {
        let mapper = JsonTagFilterMapper;
        assert_eq!(normalize_tag_filter(&mapper, None, "f").unwrap(), None);
        assert_eq!(
            normalize_tag_filter(&mapper, Some(&TagFilter::empty_expression()), "f").unwrap(),
            None
        );

        let bad = TagFilter::string_comparison("NOT_APPLICABLE", "host.name", "MATCHES", "x");
        let diags = normalize_tag_filter(&mapper, Some(&bad), "f").unwrap_err();
        assert_eq!(diags[0].summary, "Failed to map tag filter expression");
    }
}
