//! Data model: report links in, structured report records out.
//!
//! The persisted artifact is a `Vec<ReportResult>`; everything else here is
//! either transient (per-report) or reporting-only ([`BatchStats`]).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One entry of the input list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLink {
    /// URL of the report document, used exactly as given.
    pub url: String,
}

impl ReportLink {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// The structured outcome for one report.
///
/// `Parsed` keeps the model's JSON object verbatim (key order included), so
/// what gets persisted is exactly what the model produced. Use
/// [`ParsedReport::record`] for a typed view of the expected fields.
///
/// Serialised untagged: a parsed report is the bare object, a failure is
/// `{ "error": ..., "raw_output": ... }` with `raw_output` omitted when absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParsedReport {
    Failed {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        raw_output: Option<String>,
    },
    Parsed(Map<String, Value>),
}

impl ParsedReport {
    pub fn failed(error: impl Into<String>) -> Self {
        ParsedReport::Failed {
            error: error.into(),
            raw_output: None,
        }
    }

    pub fn failed_with_output(error: impl Into<String>, raw_output: impl Into<String>) -> Self {
        ParsedReport::Failed {
            error: error.into(),
            raw_output: Some(raw_output.into()),
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, ParsedReport::Parsed(_))
    }

    /// Whether this report counts as a success.
    ///
    /// A parsed object that carries an `error` key is the model reporting a
    /// failure of its own and counts as failed.
    pub fn succeeded(&self) -> bool {
        matches!(self, ParsedReport::Parsed(map) if !map.contains_key("error"))
    }

    /// The failure message, if this is a failure.
    pub fn error(&self) -> Option<&str> {
        match self {
            ParsedReport::Failed { error, .. } => Some(error),
            ParsedReport::Parsed(_) => None,
        }
    }

    /// Best-effort typed view of a parsed report.
    ///
    /// Returns `None` for failures and for objects whose top-level fields
    /// have the wrong JSON types. Never modifies the stored object.
    pub fn record(&self) -> Option<ReportRecord> {
        match self {
            ParsedReport::Parsed(map) => {
                serde_json::from_value(Value::Object(map.clone())).ok()
            }
            ParsedReport::Failed { .. } => None,
        }
    }

    /// Classify a JSON object, either a model reply or a persisted record.
    ///
    /// An object made only of a string `error` and an optional string
    /// `raw_output` is a failure; anything else is a parsed report.
    pub fn from_object(map: Map<String, Value>) -> Self {
        let failure_shape = map.keys().all(|k| k == "error" || k == "raw_output");
        if failure_shape {
            if let Some(Value::String(error)) = map.get("error") {
                match map.get("raw_output") {
                    None => return ParsedReport::failed(error.clone()),
                    Some(Value::String(raw)) => {
                        return ParsedReport::failed_with_output(error.clone(), raw.clone())
                    }
                    Some(_) => {}
                }
            }
        }
        ParsedReport::Parsed(map)
    }
}

impl<'de> Deserialize<'de> for ParsedReport {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Ok(ParsedReport::from_object(map))
    }
}

/// One element of the persisted results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResult {
    /// 1-based position among input entries that had a usable URL.
    pub report_number: usize,
    pub url: String,
    pub parsed_output: ParsedReport,
}

impl ReportResult {
    pub fn succeeded(&self) -> bool {
        self.parsed_output.succeeded()
    }
}

/// Counters for one batch run. Reporting only; not persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Entries in the input list, usable or not.
    pub total_entries: usize,
    /// Entries skipped for a missing/empty URL or a malformed shape.
    pub skipped_entries: usize,
    /// Entries that went through fetch + interpret.
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

/// Everything a batch run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutput {
    /// Results in processing order.
    pub results: Vec<ReportResult>,
    pub stats: BatchStats,
}

// ── Typed view ───────────────────────────────────────────────────────────

/// Typed view of the record the extraction prompt asks for.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReportRecord {
    #[serde(rename = "Patient_Name", default)]
    pub patient_name: Option<String>,
    #[serde(rename = "Report_Date", default)]
    pub report_date: Option<String>,
    #[serde(rename = "Test_Name", default)]
    pub test_name: Option<String>,
    #[serde(rename = "Key_Findings", default)]
    pub key_findings: Option<String>,
    /// Test results in the order the model listed them. Entries that are
    /// not objects are dropped from the view.
    #[serde(rename = "Test_Results", default, deserialize_with = "results_in_order")]
    pub test_results: Vec<(String, TestResult)>,
}

impl ReportRecord {
    pub fn result(&self, name: &str) -> Option<&TestResult> {
        self.test_results
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
    }

    /// Results whose status is anything other than `Normal`.
    pub fn abnormal_results(&self) -> impl Iterator<Item = (&str, &TestResult)> {
        self.test_results
            .iter()
            .filter(|(_, r)| matches!(r.status, Some(s) if s != TestStatus::Normal))
            .map(|(n, r)| (n.as_str(), r))
    }
}

/// One row of `Test_Results`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TestResult {
    #[serde(rename = "Value", default, deserialize_with = "lenient_string")]
    pub value: Option<String>,
    #[serde(rename = "Reference_Range", default, deserialize_with = "lenient_string")]
    pub reference_range: Option<String>,
    #[serde(rename = "Status", default, deserialize_with = "lenient_status")]
    pub status: Option<TestStatus>,
}

/// Classification of a value against its reference range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestStatus {
    Normal,
    High,
    Low,
    Abnormal,
}

impl TestStatus {
    /// Case-insensitive parse; unknown labels yield `None`.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "normal" => Some(TestStatus::Normal),
            "high" => Some(TestStatus::High),
            "low" => Some(TestStatus::Low),
            "abnormal" => Some(TestStatus::Abnormal),
            _ => None,
        }
    }
}

fn results_in_order<'de, D>(deserializer: D) -> Result<Vec<(String, TestResult)>, D::Error>
where
    D: Deserializer<'de>,
{
    let map: Option<Map<String, Value>> = Option::deserialize(deserializer)?;
    Ok(map
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(name, v)| {
            serde_json::from_value::<TestResult>(v)
                .ok()
                .map(|r| (name, r))
        })
        .collect())
}

// Models regularly emit numbers where strings were asked for.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

fn lenient_status<'de, D>(deserializer: D) -> Result<Option<TestStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => TestStatus::parse(&s),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parsed(v: Value) -> ParsedReport {
        match v {
            Value::Object(map) => ParsedReport::Parsed(map),
            _ => panic!("test fixture must be an object"),
        }
    }

    #[test]
    fn failure_serialises_without_raw_output_when_absent() {
        let r = ParsedReport::failed("No text extracted from report.");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v, json!({ "error": "No text extracted from report." }));
    }

    #[test]
    fn failure_serialises_raw_output_when_present() {
        let r = ParsedReport::failed_with_output("No valid JSON found", "sorry");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(
            v,
            json!({ "error": "No valid JSON found", "raw_output": "sorry" })
        );
    }

    #[test]
    fn parsed_serialises_as_bare_object_in_original_order() {
        let r = parsed(json!({ "Test_Name": "CBC", "Patient_Name": null }));
        let s = serde_json::to_string(&r).unwrap();
        assert_eq!(s, r#"{"Test_Name":"CBC","Patient_Name":null}"#);
    }

    #[test]
    fn from_object_reads_failure_shapes_back() {
        let r: ParsedReport =
            serde_json::from_value(json!({ "error": "No valid JSON found", "raw_output": "x" }))
                .unwrap();
        assert_eq!(r, ParsedReport::failed_with_output("No valid JSON found", "x"));
        assert!(!r.is_parsed());
    }

    #[test]
    fn object_with_extra_keys_stays_parsed_but_counts_as_failed() {
        let r: ParsedReport =
            serde_json::from_value(json!({ "error": "x", "Test_Name": "CBC" })).unwrap();
        assert!(r.is_parsed());
        assert!(!r.succeeded());
    }

    #[test]
    fn only_objects_without_error_key_succeed() {
        assert!(parsed(json!({ "Test_Name": "CBC" })).succeeded());
        assert!(parsed(json!({})).succeeded());
        assert!(!ParsedReport::failed("No valid JSON found").succeeded());
    }

    #[test]
    fn record_view_reads_expected_fields() {
        let r = parsed(json!({
            "Patient_Name": "Asha Rao",
            "Report_Date": "2024-03-01",
            "Test_Name": "Lipid Profile",
            "Key_Findings": "LDL elevated",
            "Test_Results": {
                "LDL": { "Value": "162", "Reference_Range": "< 130", "Status": "High" },
                "HDL": { "Value": 48, "Reference_Range": null, "Status": "Normal" }
            }
        }));
        let rec = r.record().expect("typed view");
        assert_eq!(rec.patient_name.as_deref(), Some("Asha Rao"));
        assert_eq!(rec.test_results.len(), 2);
        assert_eq!(rec.test_results[0].0, "LDL");
        assert_eq!(rec.result("HDL").and_then(|t| t.value.as_deref()), Some("48"));
        assert_eq!(rec.result("HDL").unwrap().reference_range, None);
        let abnormal: Vec<_> = rec.abnormal_results().map(|(n, _)| n).collect();
        assert_eq!(abnormal, vec!["LDL"]);
    }

    #[test]
    fn record_view_tolerates_null_results_and_unknown_status() {
        let r = parsed(json!({ "Test_Results": null }));
        assert!(r.record().unwrap().test_results.is_empty());

        let r = parsed(json!({
            "Test_Results": { "TSH": { "Value": "2.1", "Status": "Borderline" } }
        }));
        assert_eq!(r.record().unwrap().result("TSH").unwrap().status, None);
    }

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(TestStatus::parse("HIGH"), Some(TestStatus::High));
        assert_eq!(TestStatus::parse(" low "), Some(TestStatus::Low));
        assert_eq!(TestStatus::parse("n/a"), None);
    }

    #[test]
    fn report_result_round_trips() {
        let result = ReportResult {
            report_number: 3,
            url: "https://x/report.pdf,".into(),
            parsed_output: parsed(json!({ "Patient_Name": "Zoë Ángel", "Test_Results": {} })),
        };
        let s = serde_json::to_string_pretty(&result).unwrap();
        let back: ReportResult = serde_json::from_str(&s).unwrap();
        assert_eq!(back, result);
        assert!(back.succeeded());
    }
}
