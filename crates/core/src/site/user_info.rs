//! Multi-step account data collection.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::{AssertionMissing, Body, Site, SiteError, TransformContext};
use crate::entity::{UserInfo, UserInfoStatus};
use crate::field::{is_empty_value, Coercion, FieldSelector, Source};
use crate::filters::as_text;
use crate::metadata::ProcessStep;
use crate::path;

fn is_satisfied(acc: &Map<String, Value>, field: &str) -> bool {
    acc.get(field).is_some_and(|v| !is_empty_value(v))
}

/// Put `value` into `request` at `target`.
///
/// A string already at `target` containing the `$field$` token gets the
/// token replaced; anything else is overwritten.
fn splice(request: &mut Value, target: &str, field: &str, value: &Value) {
    let token = format!("${}$", field);
    match path::get(request, target) {
        Some(Value::String(template)) if template.contains(&token) => {
            let replaced = template.replace(&token, &as_text(value));
            path::set(request, target, Value::String(replaced));
        }
        _ => path::set(request, target, value.clone()),
    }
}

impl Site {
    /// Collect account data, step by step.
    ///
    /// Fields listed in `pickLast` are seeded from `previous`. Remote and
    /// parsing failures end up in [`UserInfo::status`] together with
    /// whatever was collected so far; only a step asserting a field that
    /// nothing produced is returned as an error.
    pub async fn get_user_info(
        &self,
        previous: Option<&UserInfo>,
    ) -> Result<UserInfo, AssertionMissing> {
        let site = self.id();
        let config = match &self.metadata.user_info {
            Some(config) if self.metadata.allow_query_user_info() => config,
            _ => {
                debug!(site = %site, "User info query disabled");
                return Ok(UserInfo::with_status(site, UserInfoStatus::PassParse));
            }
        };

        let mut acc = Map::new();
        if let Some(previous) = previous {
            let last = previous.to_fields();
            for field in &config.pick_last {
                if let Some(value) = last.get(field).filter(|v| !is_empty_value(v)) {
                    acc.insert(field.clone(), value.clone());
                }
            }
        }

        for (index, step) in config.process.iter().enumerate() {
            if !step.fields.is_empty() && step.fields.iter().all(|f| is_satisfied(&acc, f)) {
                debug!(site = %site, step = index, "Step already satisfied");
                continue;
            }

            let request = self.step_request(index, step, &acc)?;
            let selectors = step.selectors.as_ref().unwrap_or(&config.selectors);

            match self.run_step(step, request, selectors, &mut acc).await {
                Ok(()) => {}
                Err(SiteError::NeedLogin) => {
                    return Ok(UserInfo::from_fields(site, UserInfoStatus::NeedLogin, &acc));
                }
                Err(e) => {
                    warn!(site = %site, step = index, error = %e, "User info step failed");
                    return Ok(UserInfo::from_fields(site, UserInfoStatus::ParseError, &acc));
                }
            }
        }

        Ok(UserInfo::from_fields(site, UserInfoStatus::Success, &acc))
    }

    fn step_request(
        &self,
        index: usize,
        step: &ProcessStep,
        acc: &Map<String, Value>,
    ) -> Result<Value, AssertionMissing> {
        let mut request = match &step.request_config {
            Value::Null => Value::Object(Map::new()),
            other => other.clone(),
        };

        for (field, target) in &step.assertion {
            let value = acc
                .get(field)
                .filter(|v| !is_empty_value(v))
                .ok_or_else(|| AssertionMissing {
                    step: index,
                    field: field.clone(),
                })?;
            splice(&mut request, target, field, value);
        }

        let ctx = TransformContext {
            metadata: &self.metadata,
            keywords: None,
            entry: None,
            user_info: Some(acc),
        };
        Ok(self.transform(step.request_config_transformer.as_deref(), &ctx, request))
    }

    async fn run_step(
        &self,
        step: &ProcessStep,
        request: Value,
        selectors: &BTreeMap<String, FieldSelector>,
        acc: &mut Map<String, Value>,
    ) -> Result<(), SiteError> {
        let exchange = self.send(request).await?;
        let body = Body::decode(exchange.response_type, &exchange.response.body)?;
        let source = match &body {
            Body::Document(doc) => Source::Element(doc.root_element()),
            Body::Json(value) => Source::Json(value),
        };
        self.extract_user_fields(source, step, selectors, acc);
        Ok(())
    }

    fn extract_user_fields(
        &self,
        source: Source<'_>,
        step: &ProcessStep,
        selectors: &BTreeMap<String, FieldSelector>,
        acc: &mut Map<String, Value>,
    ) {
        let resolver = self.resolver();
        for field in &step.fields {
            if is_satisfied(acc, field) {
                continue;
            }
            let value = if let Some(parser) = self.hooks.user_info_fields.get(field) {
                parser(acc, source)
            } else if let Some(selector) = selectors.get(field) {
                let coercion = if field == "id" {
                    Coercion::Keep
                } else {
                    Coercion::Numeric
                };
                resolver.resolve_with(source, selector, coercion)
            } else {
                debug!(site = %self.id(), field = %field, "No selector for user info field");
                continue;
            };
            if !is_empty_value(&value) {
                acc.insert(field.clone(), value);
            }
        }
    }
}
