// crates/upheaval-checks/src/upsert.rs
// ============================================================================
// Module: Upsert Convergence Checks
// Description: Keyed-ingest checks for upsert insert, update, delete, and
//              legacy source syntax.
// Purpose: Verify that upsert-maintained views converge under disruption.
// Dependencies: crate::common, upheaval-core
// ============================================================================

//! ## Overview
//! These checks exercise the upsert envelope of a keyed ingest source: the
//! same key re-ingested replaces its value, and a key-only record deletes it.
//! Each check creates its own disjoint topic and views so concurrent phase
//! calls never contend on shared objects. Validate phases assert
//! eventually-stable aggregates, so they hold no matter how many manipulate
//! steps or disruptions landed in between.

// ============================================================================
// SECTION: Imports
// ============================================================================

use upheaval_core::Applicability;
use upheaval_core::Check;
use upheaval_core::CheckMetadata;
use upheaval_core::Script;
use upheaval_core::VERSION_MIGRATION_TAG;

use crate::common::with_schemas;

// ============================================================================
// SECTION: Upsert Insert
// ============================================================================

/// Repeated inserts of identical records are collapsed by the upsert
/// envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpsertInsert;

/// Initialize body for [`UpsertInsert`].
const UPSERT_INSERT_INIT: &str = r#"$ kafka-create-topic topic=upsert-insert

$ kafka-ingest format=avro key-format=avro topic=upsert-insert key-schema=${keyschema} schema=${schema} repeat=10000
{"key1": "A${kafka-ingest.iteration}"} {"f1": "A${kafka-ingest.iteration}"}

> CREATE SOURCE upsert_insert_src
  FROM KAFKA CONNECTION kafka_conn (TOPIC 'upsert-insert')

> CREATE TABLE upsert_insert FROM SOURCE upsert_insert_src (REFERENCE "upsert-insert")
  FORMAT AVRO USING CONFLUENT SCHEMA REGISTRY CONNECTION csr_conn
  ENVELOPE UPSERT

> CREATE MATERIALIZED VIEW upsert_insert_view AS SELECT COUNT(DISTINCT key1 || ' ' || f1) FROM upsert_insert;
"#;

/// One idempotent re-ingest round for [`UpsertInsert`].
const UPSERT_INSERT_STEP: &str = r#"$ kafka-ingest format=avro key-format=avro topic=upsert-insert key-schema=${keyschema} schema=${schema} repeat=10000
{"key1": "A${kafka-ingest.iteration}"} {"f1": "A${kafka-ingest.iteration}"}
"#;

/// Validate body for [`UpsertInsert`].
const UPSERT_INSERT_VALIDATE: &str = r#"> SELECT COUNT(*), COUNT(DISTINCT key1), COUNT(DISTINCT f1) FROM upsert_insert
10000 10000 10000

> SELECT * FROM upsert_insert_view;
10000
"#;

impl Check for UpsertInsert {
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata::named("upsert-insert").with_tag("upsert")
    }

    fn initialize(&self) -> Script {
        Script::initialize(with_schemas(UPSERT_INSERT_INIT))
    }

    fn manipulate(&self) -> Vec<Script> {
        vec![
            Script::manipulate(with_schemas(UPSERT_INSERT_STEP)),
            Script::manipulate(with_schemas(UPSERT_INSERT_STEP)),
        ]
    }

    fn validate(&self) -> Script {
        Script::validate(UPSERT_INSERT_VALIDATE)
    }
}

// ============================================================================
// SECTION: Upsert Update
// ============================================================================

/// Re-ingesting a key with a new value replaces the old value.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpsertUpdate;

/// Initialize body for [`UpsertUpdate`].
const UPSERT_UPDATE_INIT: &str = r#"$ kafka-create-topic topic=upsert-update

$ kafka-ingest format=avro key-format=avro topic=upsert-update key-schema=${keyschema} schema=${schema} repeat=10000
{"key1": "${kafka-ingest.iteration}"} {"f1": "A${kafka-ingest.iteration}"}

> CREATE SOURCE upsert_update_src
  FROM KAFKA CONNECTION kafka_conn (TOPIC 'upsert-update')

> CREATE TABLE upsert_update FROM SOURCE upsert_update_src (REFERENCE "upsert-update")
  FORMAT AVRO USING CONFLUENT SCHEMA REGISTRY CONNECTION csr_conn
  ENVELOPE UPSERT

> CREATE MATERIALIZED VIEW upsert_update_view AS SELECT LEFT(f1, 1), COUNT(*) AS c1, COUNT(DISTINCT key1) AS c2, COUNT(DISTINCT f1) AS c3 FROM upsert_update GROUP BY LEFT(f1, 1);
"#;

/// B-generation rewrite for [`UpsertUpdate`].
const UPSERT_UPDATE_STEP_B: &str = r#"$ kafka-ingest format=avro key-format=avro topic=upsert-update key-schema=${keyschema} schema=${schema} repeat=10000
{"key1": "${kafka-ingest.iteration}"} {"f1": "B${kafka-ingest.iteration}"}
"#;

/// C-generation rewrite for [`UpsertUpdate`].
const UPSERT_UPDATE_STEP_C: &str = r#"$ kafka-ingest format=avro key-format=avro topic=upsert-update key-schema=${keyschema} schema=${schema} repeat=10000
{"key1": "${kafka-ingest.iteration}"} {"f1": "C${kafka-ingest.iteration}"}
"#;

/// Validate body for [`UpsertUpdate`]: only the final generation survives.
const UPSERT_UPDATE_VALIDATE: &str = r#"> SELECT * FROM upsert_update_view;
C 10000 10000 10000
"#;

impl Check for UpsertUpdate {
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata::named("upsert-update").with_tag("upsert")
    }

    fn initialize(&self) -> Script {
        Script::initialize(with_schemas(UPSERT_UPDATE_INIT))
    }

    fn manipulate(&self) -> Vec<Script> {
        vec![
            Script::manipulate(with_schemas(UPSERT_UPDATE_STEP_B)),
            Script::manipulate(with_schemas(UPSERT_UPDATE_STEP_C)),
        ]
    }

    fn validate(&self) -> Script {
        Script::validate(UPSERT_UPDATE_VALIDATE)
    }
}

// ============================================================================
// SECTION: Upsert Delete
// ============================================================================

/// Key-only records tombstone previously ingested keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpsertDelete;

/// Initialize body for [`UpsertDelete`]: keys 0..29999.
const UPSERT_DELETE_INIT: &str = r#"$ kafka-create-topic topic=upsert-delete

$ kafka-ingest format=avro key-format=avro topic=upsert-delete key-schema=${keyschema} schema=${schema} repeat=30000
{"key1": "${kafka-ingest.iteration}"} {"f1": "${kafka-ingest.iteration}"}

> CREATE SOURCE upsert_delete_src
  FROM KAFKA CONNECTION kafka_conn (TOPIC 'upsert-delete')

> CREATE TABLE upsert_delete FROM SOURCE upsert_delete_src (REFERENCE "upsert-delete")
  FORMAT AVRO USING CONFLUENT SCHEMA REGISTRY CONNECTION csr_conn
  ENVELOPE UPSERT

> CREATE MATERIALIZED VIEW upsert_delete_view AS SELECT COUNT(*), MIN(key1), MAX(key1) FROM upsert_delete;
"#;

/// Tombstones for keys 0..9999.
const UPSERT_DELETE_STEP_LOW: &str = r#"$ kafka-ingest format=avro key-format=avro topic=upsert-delete key-schema=${keyschema} schema=${schema} repeat=10000
{"key1": "${kafka-ingest.iteration}"}
"#;

/// Tombstones for keys 20000..29999.
const UPSERT_DELETE_STEP_HIGH: &str = r#"$ kafka-ingest format=avro key-format=avro topic=upsert-delete key-schema=${keyschema} schema=${schema} start-iteration=20000 repeat=10000
{"key1": "${kafka-ingest.iteration}"}
"#;

/// Validate body for [`UpsertDelete`]: the middle band survives.
const UPSERT_DELETE_VALIDATE: &str = r#"> SELECT * FROM upsert_delete_view;
10000 10000 19999
"#;

impl Check for UpsertDelete {
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata::named("upsert-delete").with_tag("upsert")
    }

    fn initialize(&self) -> Script {
        Script::initialize(with_schemas(UPSERT_DELETE_INIT))
    }

    fn manipulate(&self) -> Vec<Script> {
        vec![
            Script::manipulate(with_schemas(UPSERT_DELETE_STEP_LOW)),
            Script::manipulate(with_schemas(UPSERT_DELETE_STEP_HIGH)),
        ]
    }

    fn validate(&self) -> Script {
        Script::validate(UPSERT_DELETE_VALIDATE)
    }
}

// ============================================================================
// SECTION: Upsert Legacy Syntax
// ============================================================================

/// Upsert source created through the legacy syntax.
///
/// Only meaningful under version-migration scenarios, where the migration is
/// expected to carry the legacy definition across the upgrade; elsewhere the
/// registry reports it skipped without invoking any phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpsertLegacy;

/// Initialize body for [`UpsertLegacy`] using the legacy source syntax.
const UPSERT_LEGACY_INIT: &str = r#"$ kafka-create-topic topic=upsert-legacy-syntax

$ kafka-ingest format=avro key-format=avro topic=upsert-legacy-syntax key-schema=${keyschema} schema=${schema} repeat=10000
{"key1": "A${kafka-ingest.iteration}"} {"f1": "A${kafka-ingest.iteration}"}

> CREATE SOURCE upsert_insert_legacy
  FROM KAFKA CONNECTION kafka_conn (TOPIC 'upsert-legacy-syntax')
  FORMAT AVRO USING CONFLUENT SCHEMA REGISTRY CONNECTION csr_conn
  ENVELOPE UPSERT

> CREATE MATERIALIZED VIEW upsert_insert_legacy_view AS SELECT COUNT(DISTINCT key1 || ' ' || f1) FROM upsert_insert_legacy;
"#;

/// One idempotent re-ingest round for [`UpsertLegacy`].
const UPSERT_LEGACY_STEP: &str = r#"$ kafka-ingest format=avro key-format=avro topic=upsert-legacy-syntax key-schema=${keyschema} schema=${schema} repeat=10000
{"key1": "A${kafka-ingest.iteration}"} {"f1": "A${kafka-ingest.iteration}"}
"#;

/// Validate body for [`UpsertLegacy`].
const UPSERT_LEGACY_VALIDATE: &str = r#"> SELECT COUNT(*), COUNT(DISTINCT key1), COUNT(DISTINCT f1) FROM upsert_insert_legacy
10000 10000 10000

> SELECT * FROM upsert_insert_legacy_view;
10000
"#;

impl Check for UpsertLegacy {
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata::named("upsert-legacy")
            .with_tag("upsert")
            .with_tag("legacy")
            .with_applicability(Applicability::RequiresScenarioTag(
                VERSION_MIGRATION_TAG.to_string(),
            ))
    }

    fn initialize(&self) -> Script {
        Script::initialize(with_schemas(UPSERT_LEGACY_INIT))
    }

    fn manipulate(&self) -> Vec<Script> {
        vec![
            Script::manipulate(with_schemas(UPSERT_LEGACY_STEP)),
            Script::manipulate(with_schemas(UPSERT_LEGACY_STEP)),
        ]
    }

    fn validate(&self) -> Script {
        Script::validate(UPSERT_LEGACY_VALIDATE)
    }
}
