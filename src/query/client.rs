//! Query client: template scripts, design export and replay over a
//! [`GraphStore`]

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value as JsonValue;

use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::scalar::{Scalar, TypeLadder};
use crate::core::store::{GraphStore, Row, StoreError};
use crate::entities::component::Catalog;
use crate::entities::design::Design;
use crate::entities::wire::{WireConnection, WireDesign, WireInstance};
use crate::query::template::TemplateLoader;

/// Template key the built-in design templates are written against
pub const DESIGN_KEY: &str = "__DESIGN__";

const EXPORT_TEMPLATE: &str = "design_export";

/// One live connection to a design store
///
/// The client owns the store. Dropping it without [`Client::close`] leaves
/// closing to the store's own drop handling.
pub struct Client<S: GraphStore> {
    store: S,
    templates: TemplateLoader,
    timeout: Duration,
    ladder: TypeLadder,
}

/// Result of one template block
pub type BlockResult = Result<Vec<Row>>;

impl<S: GraphStore> Client<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            templates: TemplateLoader::default(),
            timeout: Config::default().query_timeout(),
            ladder: TypeLadder::default(),
        }
    }

    /// Client with template paths, timeout and type ladder taken from `config`
    pub fn from_config(store: S, config: &Config) -> Self {
        Self {
            store,
            templates: TemplateLoader::new(config.template_paths.clone()),
            timeout: config.query_timeout(),
            ladder: config.type_ladder(),
        }
    }

    pub fn with_templates(mut self, templates: TemplateLoader) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_type_ladder(mut self, ladder: TypeLadder) -> Self {
        self.ladder = ladder;
        self
    }

    pub fn templates(&self) -> &TemplateLoader {
        &self.templates
    }

    pub fn type_ladder(&self) -> &TypeLadder {
        &self.ladder
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Run every block of a template, in order
    ///
    /// The outer `Result` fails only when nothing could be attempted: the
    /// template is missing, a key is not an identifier or the store is
    /// already closed. Each block then gets its own result, so a timeout in
    /// one block does not stop the blocks after it.
    pub fn submit_script(
        &mut self,
        name: &str,
        params: &BTreeMap<String, Scalar>,
    ) -> Result<Vec<BlockResult>> {
        let template = self.templates.load(name)?;
        let queries = template.render(params)?;
        if !self.store.is_open() {
            return Err(StoreError::Closed.into());
        }

        let timeout_ms = self.timeout.as_millis() as u64;
        let mut results = Vec::with_capacity(queries.len());
        for (block, query) in queries.iter().enumerate() {
            if !self.store.is_open() {
                results.push(Err(StoreError::Closed.into()));
                continue;
            }
            tracing::debug!(template = name, block, "submitting query block");
            let outcome = match self.store.submit(query, self.timeout) {
                Ok(rows) => Ok(rows),
                Err(StoreError::Timeout(_)) => {
                    tracing::warn!(template = name, block, timeout_ms, "query block timed out");
                    Err(Error::QueryTimeout {
                        template: name.to_string(),
                        block,
                        timeout_ms,
                    })
                }
                Err(e) => Err(e.into()),
            };
            results.push(outcome);
        }
        Ok(results)
    }

    pub fn design_names(&mut self) -> Result<Vec<String>> {
        Ok(self.store.design_names()?)
    }

    pub fn delete_design(&mut self, name: &str) -> Result<()> {
        self.store.delete_design(name)?;
        tracing::info!(design = name, "deleted design");
        Ok(())
    }

    /// Read a stored design back into wire form
    pub fn export_design(&mut self, name: &str) -> Result<WireDesign> {
        if !self.store.design_names()?.iter().any(|d| d == name) {
            return Err(Error::UnknownDesign {
                design: name.to_string(),
            });
        }

        let mut params = BTreeMap::new();
        params.insert(DESIGN_KEY.to_string(), Scalar::Str(name.replace('\'', "''")));

        let mut blocks = self
            .submit_script(EXPORT_TEMPLATE, &params)?
            .into_iter()
            .collect::<Result<Vec<_>>>()?
            .into_iter();
        let mut next = || blocks.next().unwrap_or_default();
        let (parameters, instances, assignments, connections) = (next(), next(), next(), next());

        let mut doc = WireDesign {
            design: name.to_string(),
            ..Default::default()
        };
        for row in &parameters {
            doc.parameters.insert(text(row, "name"), text(row, "value"));
        }
        let mut by_name: BTreeMap<String, WireInstance> = instances
            .iter()
            .map(|row| {
                let inst = WireInstance {
                    model: text(row, "model"),
                    name: text(row, "name"),
                    assignment: BTreeMap::new(),
                };
                (inst.name.clone(), inst)
            })
            .collect();
        for row in &assignments {
            if let Some(inst) = by_name.get_mut(&text(row, "instance")) {
                inst.assignment.insert(text(row, "attr"), text(row, "parameter"));
            }
        }
        doc.instances = by_name.into_values().collect();
        doc.connections = connections
            .iter()
            .map(|row| WireConnection {
                connector1: text(row, "connector1"),
                connector2: text(row, "connector2"),
                instance1: text(row, "instance1"),
                instance2: text(row, "instance2"),
            })
            .collect();

        Ok(doc)
    }

    /// Replay a complete design onto the store
    ///
    /// Models and connectors are checked against `catalog` before the first
    /// remote call. A failure part way leaves the calls already made on the
    /// store.
    pub fn push_design(&mut self, design: &Design, catalog: &Catalog) -> Result<()> {
        for inst in design.instances.values() {
            catalog.get_model(&inst.model)?;
        }
        design.check_integrity()?;
        design.check_connectors(catalog)?;

        let name = design.name.as_str();
        self.store.create_design(name)?;
        for param in design.parameters.values() {
            self.store
                .create_parameter(name, &param.name, &param.value.to_string())?;
        }
        for inst in design.instances.values() {
            self.store.create_instance(name, &inst.model, &inst.name)?;
        }
        for inst in design.instances.values() {
            for (attribute, parameter) in &inst.assignment {
                self.store
                    .assign_parameter(name, &inst.name, attribute, parameter)?;
            }
        }
        for conn in &design.connections {
            self.store.create_connection(
                name,
                &conn.instance1,
                &conn.connector1,
                &conn.instance2,
                &conn.connector2,
            )?;
        }

        let anchors: Vec<_> = design.orient_instances(catalog).collect();
        if let [anchor] = anchors.as_slice() {
            self.store.orient_design(name, &anchor.name)?;
        }

        tracing::info!(
            design = name,
            instances = design.instances.len(),
            connections = design.connections.len(),
            "pushed design"
        );
        Ok(())
    }

    /// Release the connection
    pub fn close(mut self) -> Result<()> {
        self.store.close()?;
        Ok(())
    }
}

fn text(row: &Row, column: &str) -> String {
    match row.get(column) {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
