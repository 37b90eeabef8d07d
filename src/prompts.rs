//! Prompt for turning report text into a structured JSON record.
//!
//! Callers can override the default via
//! [`crate::config::ExtractionConfig::prompt_template`]; the constant here is
//! used only when no override is provided.

/// Placeholder replaced with the extracted report text.
pub const REPORT_TEXT_PLACEHOLDER: &str = "{report_text}";

/// Default extraction prompt. `{report_text}` is replaced verbatim.
pub const DEFAULT_EXTRACTION_PROMPT: &str = r#"You are a medical report parser. Extract structured information from the report text.

Report text:
---
{report_text}
---

Return JSON with the following structure:

{
  "Patient_Name": "string or null",
  "Report_Date": "YYYY-MM-DD or null",
  "Test_Name": "string or null",
  "Key_Findings": "string or null",
  "Test_Results": {
     "Parameter_Name": {
        "Value": "string",
        "Reference_Range": "string or null",
        "Status": "Normal | High | Low | Abnormal | null"
     },
     ...
  }
}

Rules:
- Do NOT include Patient_ID or any other patient identifier in the output.
- If a field is not explicitly mentioned, return null.
- Patient_Name may appear as "Patient Name", "Name of Patient", "Patient:".
- Report_Date may appear as "Date", "Reported On", "Report Generated".
- Key_Findings should summarize abnormalities.
- For Test_Results:
  - Always include Value, Reference_Range, Status.
  - Status should be "Normal" if the value is within the reference range, otherwise "High", "Low", or "Abnormal".
  - If Reference_Range is not given, return null.
- Output valid JSON only."#;

/// Build the prompt for one report.
///
/// Uses `template` when given, otherwise [`DEFAULT_EXTRACTION_PROMPT`]. The
/// report text is inserted exactly as extracted.
pub fn build_extraction_prompt(report_text: &str, template: Option<&str>) -> String {
    template
        .unwrap_or(DEFAULT_EXTRACTION_PROMPT)
        .replacen(REPORT_TEXT_PLACEHOLDER, report_text, 1)
}
