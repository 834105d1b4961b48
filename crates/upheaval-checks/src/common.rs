// crates/upheaval-checks/src/common.rs
// ============================================================================
// Module: Shared Workload Preambles
// Description: Schema preamble shared by keyed-ingest workload scripts.
// Purpose: Keep the key/value schema declaration in one place.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Every keyed-ingest check starts its scripts with the same schema
//! declaration so the external executor can encode keys and values. The
//! harness never interprets this text.

// ============================================================================
// SECTION: Schema Preamble
// ============================================================================

/// Schema declaration for a single-string-field key and value.
pub const KEYED_STRING_SCHEMAS: &str = r#"$ set keyschema={
    "type": "record",
    "name": "Key",
    "fields": [
        {"name": "key1", "type": "string"}
    ]
  }

$ set schema={
        "type" : "record",
        "name" : "test",
        "fields" : [
            {"name":"f1", "type":"string"}
        ]
    }

"#;

/// Returns the schema preamble prepended to a script body.
#[must_use]
pub fn with_schemas(body: &str) -> String {
    format!("{KEYED_STRING_SCHEMAS}{body}")
}
