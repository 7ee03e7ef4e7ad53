// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Named, typed task fields that can be changed while a pipeline is alive.
//!
//! A task type declares its options with an [`OptionSet`]. Each configured task
//! gets an [`OptionsHandle`]; updates written through the handle are checked
//! against the declaration, kept as pending and applied together right before
//! the next execution of the task. Writing one key several times before that
//! execution keeps only the last value.

use parking_lot::Mutex;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::OptionError;
use crate::observability::messages::pipeline::OptionRejected;
use crate::observability::messages::StructuredLog;

type Apply<T> = Box<dyn Fn(&mut T, Box<dyn Any + Send>) + Send + Sync>;

struct OptionField<T> {
    schema: OptionSchema,
    apply: Apply<T>,
}

/// Declared shape of one option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSchema {
    pub key: String,
    pub type_name: &'static str,
    type_id: TypeId,
}

/// Option declaration of a task type.
pub struct OptionSet<T> {
    fields: Vec<OptionField<T>>,
}

impl<T: 'static> OptionSet<T> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Declares `key` as the field returned by `accessor`. A later declaration
    /// of the same key replaces the earlier one.
    pub fn field<V: Send + 'static>(
        mut self,
        key: impl Into<String>,
        accessor: fn(&mut T) -> &mut V,
    ) -> Self {
        let key = key.into();
        self.fields.retain(|field| field.schema.key != key);
        self.fields.push(OptionField {
            schema: OptionSchema {
                key,
                type_name: type_name::<V>(),
                type_id: TypeId::of::<V>(),
            },
            apply: Box::new(move |task, value| {
                if let Ok(value) = value.downcast::<V>() {
                    *accessor(task) = *value;
                }
            }),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn schema(&self) -> Vec<OptionSchema> {
        self.fields.iter().map(|field| field.schema.clone()).collect()
    }

    /// Writes every pending value of `handle` into `task`.
    pub(crate) fn apply_pending(&self, task: &mut T, handle: &OptionsHandle) {
        for (key, value) in handle.take_pending() {
            if let Some(field) = self.fields.iter().find(|field| field.schema.key == key) {
                (field.apply)(task, value);
            }
        }
    }
}

impl<T: 'static> Default for OptionSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct OptionsState {
    task: String,
    schema: Vec<OptionSchema>,
    pending: Mutex<HashMap<String, Box<dyn Any + Send>>>,
}

/// Thread-safe handle for updating the options of one configured task.
#[derive(Clone)]
pub struct OptionsHandle {
    state: Arc<OptionsState>,
}

impl OptionsHandle {
    pub(crate) fn new(task: impl Into<String>, schema: Vec<OptionSchema>) -> Self {
        Self {
            state: Arc::new(OptionsState {
                task: task.into(),
                schema,
                pending: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Queues `value` for the option `key`.
    ///
    /// Rejected updates leave the option at its previous value.
    pub fn set<V: Send + 'static>(&self, key: &str, value: V) -> Result<(), OptionError> {
        let result = self.check::<V>(key);
        if let Err(error) = &result {
            OptionRejected {
                task: &self.state.task,
                key,
                error,
            }
            .log();
            return result;
        }

        self.state
            .pending
            .lock()
            .insert(key.to_string(), Box::new(value));
        Ok(())
    }

    fn check<V: 'static>(&self, key: &str) -> Result<(), OptionError> {
        let schema = self
            .state
            .schema
            .iter()
            .find(|schema| schema.key == key)
            .ok_or_else(|| OptionError::UnknownKey {
                task: self.state.task.clone(),
                key: key.to_string(),
            })?;

        if schema.type_id != TypeId::of::<V>() {
            return Err(OptionError::TypeMismatch {
                task: self.state.task.clone(),
                key: key.to_string(),
                expected: schema.type_name,
                found: type_name::<V>(),
            });
        }
        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.state.schema.iter().map(|schema| schema.key.as_str())
    }

    pub fn has_pending(&self) -> bool {
        !self.state.pending.lock().is_empty()
    }

    fn take_pending(&self) -> Vec<(String, Box<dyn Any + Send>)> {
        self.state.pending.lock().drain().collect()
    }
}

impl std::fmt::Debug for OptionsHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("OptionsHandle")
            .field("task", &self.state.task)
            .field("schema", &self.state.schema)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Blur {
        radius: u32,
        label: String,
    }

    fn blur_options() -> OptionSet<Blur> {
        OptionSet::new()
            .field("radius", |blur: &mut Blur| &mut blur.radius)
            .field("label", |blur: &mut Blur| &mut blur.label)
    }

    fn handle(set: &OptionSet<Blur>) -> OptionsHandle {
        OptionsHandle::new("blur", set.schema())
    }

    #[test]
    fn test_last_write_wins() {
        let options = blur_options();
        let handle = handle(&options);
        let mut blur = Blur::default();

        handle.set("radius", 3u32).unwrap();
        handle.set("radius", 5u32).unwrap();
        handle.set("radius", 9u32).unwrap();
        options.apply_pending(&mut blur, &handle);

        assert_eq!(blur.radius, 9);
        assert!(!handle.has_pending());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let options = blur_options();
        let handle = handle(&options);
        let error = handle.set("sigma", 1.5f64).unwrap_err();
        assert!(matches!(error, OptionError::UnknownKey { .. }));
        assert!(!handle.has_pending());
    }

    #[test]
    fn test_type_mismatch_keeps_previous_value() {
        let options = blur_options();
        let handle = handle(&options);
        let mut blur = Blur {
            radius: 2,
            label: String::new(),
        };

        handle.set("label", "soft".to_string()).unwrap();
        let error = handle.set("radius", 4i64).unwrap_err();
        assert!(matches!(error, OptionError::TypeMismatch { .. }));

        options.apply_pending(&mut blur, &handle);
        assert_eq!(blur.radius, 2);
        assert_eq!(blur.label, "soft");
    }

    #[test]
    fn test_redeclared_key_replaces_field() {
        let options = blur_options().field("radius", |blur: &mut Blur| &mut blur.radius);
        assert_eq!(options.len(), 2);
        let keys: Vec<String> = options.schema().into_iter().map(|s| s.key).collect();
        assert_eq!(keys, vec!["label".to_string(), "radius".to_string()]);
    }
}
