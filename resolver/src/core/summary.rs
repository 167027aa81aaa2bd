//! Human-readable license summaries for logs and CLI output.

/// Known license feature names.
pub const KNOWN_FEATURES: [&str; 42] = [
    "ANALYSIS",
    "AOS_DATA",
    "AUTOMATIC_CLASSIFIER_EDITING",
    "AXS_ONE",
    "CASE_CREATION",
    "CUSTOM_NAMED_ENTITIES",
    "CYBER_CONTEXT",
    "DESKTOP",
    "ELASTIC_SEARCH",
    "EXCHANGE_WS",
    "EXPORT_CASE_SUBSET",
    "EXPORT_DISCOVER",
    "EXPORT_ITEMS",
    "EXPORT_LEGAL",
    "EXPORT_SINGLE_ITEM",
    "EXPORT_VIEW",
    "FAST_REVIEW",
    "FRONT_LOAD_METADATA",
    "GENERAL_DATA",
    "GRAPH",
    "GWAVA",
    "IMAP_POP",
    "LIGHT_SPEED",
    "LOG_STASH",
    "LOTUS_NOTES",
    "MAIL_XTENDER",
    "METADATA_IMPORT",
    "MICROSOFT_GRAPH",
    "MOBILE_DEVICE_IMAGING",
    "NETWORK_DATA",
    "OCR_PROCESSING",
    "OTHER_EMAIL",
    "OUTLOOK",
    "OUTLOOK_EXPRESS",
    "PARTIAL_LOAD",
    "PRODUCTION_SET",
    "SCRIPTING",
    "SYMANTEC_VAULT",
    "UNRESTRICTED_CASE_ACCESS",
    "WORKER",
    "WORKER_SCRIPTING",
    "ZANTAZ",
];

/// Descriptive properties of a license offer. All fields are optional except the
/// short name, since providers vary in what they report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicenseDetails {
    pub location: Option<String>,
    pub source_type: Option<String>,
    pub short_name: String,
    pub description: Option<String>,
    pub count: Option<u32>,
    pub workers: Option<u32>,
    pub features: Vec<String>,
}

/// One-line summary: `[Location=.., Type=.., ShortName=.., ...]`.
pub fn summarize(details: &LicenseDetails) -> String {
    format!(
        "[Location={}, Type={}, ShortName={}, Description={}, Count={}, Workers={}, Features={}]",
        or_null(details.location.as_deref()),
        or_null(details.source_type.as_deref()),
        details.short_name,
        or_null(details.description.as_deref()),
        or_null(details.count.map(|c| c.to_string()).as_deref()),
        or_null(details.workers.map(|w| w.to_string()).as_deref()),
        details.features.join("; "),
    )
}

/// Multi-line `[X] FEATURE` listing of every known feature.
pub fn feature_matrix(details: &LicenseDetails) -> String {
    let mut lines = vec!["License Features:".to_string()];
    for feature in KNOWN_FEATURES {
        let mark = if details.features.iter().any(|f| f == feature) {
            "X"
        } else {
            " "
        };
        lines.push(format!("[{mark}] {feature}"));
    }
    lines.join("\n")
}

fn or_null(value: Option<&str>) -> &str {
    value.unwrap_or("null")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LicenseDetails {
        LicenseDetails {
            location: Some("nms.internal:27443".to_string()),
            source_type: Some("server".to_string()),
            short_name: "enterprise-workstation".to_string(),
            description: Some("Enterprise Workstation".to_string()),
            count: Some(3),
            workers: Some(8),
            features: vec!["CASE_CREATION".to_string(), "OCR_PROCESSING".to_string()],
        }
    }

    #[test]
    fn summary_lists_all_fields() {
        assert_eq!(
            summarize(&sample()),
            "[Location=nms.internal:27443, Type=server, ShortName=enterprise-workstation, \
             Description=Enterprise Workstation, Count=3, Workers=8, \
             Features=CASE_CREATION; OCR_PROCESSING]"
        );
    }

    #[test]
    fn summary_marks_missing_values() {
        let details = LicenseDetails {
            short_name: "dongle-basic".to_string(),
            ..LicenseDetails::default()
        };
        assert_eq!(
            summarize(&details),
            "[Location=null, Type=null, ShortName=dongle-basic, Description=null, Count=null, Workers=null, Features=]"
        );
    }

    #[test]
    fn feature_matrix_marks_enabled_features() {
        let matrix = feature_matrix(&sample());
        assert!(matrix.starts_with("License Features:\n"));
        assert!(matrix.contains("[X] CASE_CREATION"));
        assert!(matrix.contains("[ ] ZANTAZ"));
        assert_eq!(matrix.lines().count(), KNOWN_FEATURES.len() + 1);
    }
}
