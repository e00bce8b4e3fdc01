//! Interface document compiler
//!
//! Renders two OpenAPI documents into one Markdown interface description:
//! the internal system's operations are messages the external system sends to
//! it, and the external system's operations are messages flowing back.

use anyhow::Context as _;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};

use crate::schema::{
    flatten_with_policy, load_document, operations, Catalog, FallbackPolicy, Operation, TableSet,
};

const TEMPLATE_NAME: &str = "interface.md";
const TEMPLATE: &str = include_str!("../../templates/interface.md.tera");

pub const BODY_TABLE: &str = "JSON Message Body";
pub const RESPONSE_TABLE: &str = "Response";

#[derive(Debug, Serialize)]
struct SectionView {
    sender: String,
    receiver: String,
    messages: Vec<MessageView>,
}

#[derive(Debug, Serialize)]
struct MessageView {
    title: String,
    verb: String,
    path: String,
    trigger: String,
    notes: String,
    no_body: bool,
    body: Vec<TableView>,
    response: Vec<TableView>,
}

#[derive(Debug, Serialize)]
struct TableView {
    name: String,
    rows: Vec<RowView>,
}

#[derive(Debug, Serialize)]
struct RowView {
    property: String,
    description: String,
    type_label: String,
    required: &'static str,
}

/// Keep cell text on one Markdown table row
fn cell(text: &str) -> String {
    text.replace('|', "\\|")
        .replace("\r\n", "<br>")
        .replace('\n', "<br>")
}

fn table_views(tables: TableSet) -> Vec<TableView> {
    tables
        .into_iter()
        .map(|(name, table)| TableView {
            name: cell(&name),
            rows: table
                .into_iter()
                .map(|(property, row)| RowView {
                    property: cell(&property),
                    description: cell(&row.description),
                    type_label: cell(&row.type_label),
                    required: if row.required { "True" } else { "False" },
                })
                .collect(),
        })
        .collect()
}

pub struct InterfaceCompiler {
    internal: String,
    external: String,
    internal_spec: Value,
    external_spec: Value,
    policy: FallbackPolicy,
}

impl InterfaceCompiler {
    pub fn new(
        internal: impl Into<String>,
        external: impl Into<String>,
        internal_spec: Value,
        external_spec: Value,
    ) -> Self {
        Self {
            internal: internal.into(),
            external: external.into(),
            internal_spec,
            external_spec,
            policy: FallbackPolicy::default(),
        }
    }

    /// Load both documents from disk (JSON or YAML)
    pub fn from_files(
        internal: impl Into<String>,
        external: impl Into<String>,
        internal_spec: &Path,
        external_spec: &Path,
    ) -> anyhow::Result<Self> {
        let internal_doc = load_document(internal_spec)
            .with_context(|| format!("Failed to load {}", internal_spec.display()))?;
        let external_doc = load_document(external_spec)
            .with_context(|| format!("Failed to load {}", external_spec.display()))?;
        Ok(Self::new(internal, external, internal_doc, external_doc))
    }

    pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// `{external}-{internal}-Interface.md`
    pub fn default_output(&self) -> PathBuf {
        PathBuf::from(format!("{}-{}-Interface.md", self.external, self.internal))
    }

    pub fn compile(&self) -> anyhow::Result<String> {
        let sections = vec![
            self.section(&self.external, &self.internal, &self.internal_spec)?,
            self.section(&self.internal, &self.external, &self.external_spec)?,
        ];

        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, TEMPLATE)?;

        let mut context = Context::new();
        context.insert("internal", &cell(&self.internal));
        context.insert("external", &cell(&self.external));
        context.insert("sections", &sections);

        Ok(tera.render(TEMPLATE_NAME, &context)?)
    }

    /// Compile and write to `output`, or the default file name
    pub fn write(&self, output: Option<&Path>) -> anyhow::Result<PathBuf> {
        let path = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.default_output());
        let rendered = self.compile()?;
        std::fs::write(&path, rendered)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Interface document written to {}", path.display());
        Ok(path)
    }

    fn section(
        &self,
        sender: &str,
        receiver: &str,
        document: &Value,
    ) -> anyhow::Result<SectionView> {
        let catalog = Catalog::from_document(document);
        let messages = operations(document)
            .into_iter()
            .map(|operation| self.message(&operation, &catalog))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(SectionView {
            sender: cell(sender),
            receiver: cell(receiver),
            messages,
        })
    }

    fn message(&self, operation: &Operation<'_>, catalog: &Catalog) -> anyhow::Result<MessageView> {
        let verb = operation.method.to_uppercase();
        let no_body = operation.is_get();

        let (body, response) = if no_body {
            (Vec::new(), Vec::new())
        } else {
            let context = || format!("{} {}", verb, operation.path);
            let body = self
                .tables(operation.request_schema(), catalog, BODY_TABLE)
                .with_context(context)?;
            let response = self
                .tables(operation.response_schema("200"), catalog, RESPONSE_TABLE)
                .with_context(context)?;
            (body, response)
        };

        Ok(MessageView {
            title: cell(&operation.title()),
            verb,
            path: cell(operation.path),
            trigger: cell(operation.summary().unwrap_or_default()),
            notes: cell(operation.description().unwrap_or_default()),
            no_body,
            body,
            response,
        })
    }

    fn tables(
        &self,
        schema: Option<&Value>,
        catalog: &Catalog,
        base_name: &str,
    ) -> anyhow::Result<Vec<TableView>> {
        let Some(schema) = schema else {
            return Ok(Vec::new());
        };
        let tables = flatten_with_policy(schema, catalog, base_name, self.policy.clone())?;
        Ok(table_views(tables))
    }
}
