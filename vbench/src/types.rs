// Copyright (c) Facebook, Inc. and its affiliates.
//
// Scenario argument conversion. Arguments may refer to cloud resources by
// name, regex or id. The converters of a scenario map argument names to
// resource type tags whose transforms resolve the reference against a
// resource catalog supplied by the caller.
//
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use vb_util::*;

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("found multiple {needle}: {}", .ids.join(", "))]
    MultipleMatches { needle: String, ids: Vec<String> },
    #[error("unknown resource type {0:?}")]
    UnknownType(String),
    #[error("invalid resource pattern ({0})")]
    Regex(#[from] regex::Error),
    #[error(transparent)]
    Catalog(#[from] anyhow::Error),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Image,
    Flavor,
    Network,
    VolumeType,
}

impl ResourceKind {
    pub fn typename(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Flavor => "flavor",
            Self::Network => "network",
            Self::VolumeType => "volume_type",
        }
    }
}

pub trait ResourceCatalog {
    fn list(&self, kind: ResourceKind) -> anyhow::Result<Vec<Resource>>;
}

/// Catalog backed by resource lists, e.g. loaded from a JSON snapshot.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticCatalog {
    pub images: Vec<Resource>,
    pub flavors: Vec<Resource>,
    pub networks: Vec<Resource>,
    pub volume_types: Vec<Resource>,
}

impl JsonLoad for StaticCatalog {}
impl JsonSave for StaticCatalog {}

impl ResourceCatalog for StaticCatalog {
    fn list(&self, kind: ResourceKind) -> anyhow::Result<Vec<Resource>> {
        Ok(match kind {
            ResourceKind::Image => self.images.clone(),
            ResourceKind::Flavor => self.flavors.clone(),
            ResourceKind::Network => self.networks.clone(),
            ResourceKind::VolumeType => self.volume_types.clone(),
        })
    }
}

/// "volume_type" -> "Volume_Type"
fn title(typename: &str) -> String {
    let mut out = String::with_capacity(typename.len());
    let mut prev_alpha = false;
    for c in typename.chars() {
        if c.is_alphabetic() && !prev_alpha {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        prev_alpha = c.is_alphabetic();
    }
    out
}

fn ids(resources: &[&Resource]) -> Vec<String> {
    resources.iter().map(|r| r.id.clone()).collect()
}

fn str_field<'a>(config: &'a Value, key: &str, typename: &str) -> Result<Option<&'a str>, ResourceError> {
    match config.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(v) => Err(ResourceError::InvalidArgument(format!(
            "{} {:?} must be a string, got {}",
            title(typename),
            key,
            v
        ))),
    }
}

/// Resolve `config` by exact `name` match, falling back to treating `name`
/// or `regex` as a pattern searched in resource names. The match must be
/// unique.
pub fn obj_from_name<'a>(
    config: &Value,
    resources: &'a [Resource],
    typename: &str,
) -> Result<&'a Resource, ResourceError> {
    let pattern = match str_field(config, "name", typename)? {
        Some(name) => {
            let exact: Vec<&Resource> = resources.iter().filter(|r| r.name == name).collect();
            match exact.len() {
                1 => return Ok(exact[0]),
                0 => name,
                _ => {
                    return Err(ResourceError::InvalidArgument(format!(
                        "{} with name '{}' is ambiguous, possible matches by id: {}",
                        title(typename),
                        name,
                        ids(&exact).join(", ")
                    )))
                }
            }
        }
        None => match str_field(config, "regex", typename)? {
            Some(regex) => regex,
            None => {
                return Err(ResourceError::InvalidArgument(format!(
                    "{} 'id', 'name', or 'regex' not found in '{}'",
                    title(typename),
                    config
                )))
            }
        },
    };

    let re = Regex::new(pattern)?;
    let matching: Vec<&Resource> = resources.iter().filter(|r| re.is_match(&r.name)).collect();
    match matching.len() {
        0 => Err(ResourceError::InvalidArgument(format!(
            "{} with pattern '{}' not found",
            title(typename),
            pattern
        ))),
        1 => Ok(matching[0]),
        _ => Err(ResourceError::InvalidArgument(format!(
            "{} with name '{}' is ambiguous, possible matches by id: {}",
            title(typename),
            pattern,
            ids(&matching).join(", ")
        ))),
    }
}

pub fn obj_from_id<'a>(
    config: &Value,
    resources: &'a [Resource],
    typename: &str,
) -> Result<&'a Resource, ResourceError> {
    let id = match str_field(config, "id", typename)? {
        Some(id) => id,
        None => {
            return Err(ResourceError::InvalidArgument(format!(
                "{} 'id' not found in '{}'",
                title(typename),
                config
            )))
        }
    };

    let matching: Vec<&Resource> = resources.iter().filter(|r| r.id == id).collect();
    match matching.len() {
        1 => Ok(matching[0]),
        0 => Err(ResourceError::InvalidArgument(format!(
            "{} with id '{}' not found",
            title(typename),
            id
        ))),
        _ => Err(ResourceError::MultipleMatches {
            needle: format!("{} with id '{}'", title(typename), id),
            ids: ids(&matching),
        }),
    }
}

/// Python-like truthiness, unset arguments are left alone.
fn is_set(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn id_or_lookup(
    catalog: &dyn ResourceCatalog,
    config: &Value,
    kind: ResourceKind,
) -> Result<Value, ResourceError> {
    if let Some(id) = config.get("id").filter(|id| is_set(id)) {
        return Ok(id.clone());
    }
    let resources = catalog.list(kind)?;
    let res = obj_from_name(config, &resources, kind.typename())?;
    Ok(Value::String(res.id.clone()))
}

pub fn glance_image(catalog: &dyn ResourceCatalog, config: &Value) -> Result<Value, ResourceError> {
    id_or_lookup(catalog, config, ResourceKind::Image)
}

pub fn nova_flavor(catalog: &dyn ResourceCatalog, config: &Value) -> Result<Value, ResourceError> {
    id_or_lookup(catalog, config, ResourceKind::Flavor)
}

pub fn neutron_network(
    catalog: &dyn ResourceCatalog,
    config: &Value,
) -> Result<Value, ResourceError> {
    id_or_lookup(catalog, config, ResourceKind::Network)
}

pub fn cinder_volume_type(
    catalog: &dyn ResourceCatalog,
    config: &Value,
) -> Result<Value, ResourceError> {
    id_or_lookup(catalog, config, ResourceKind::VolumeType)
}

pub fn glance_image_name(
    catalog: &dyn ResourceCatalog,
    config: &Value,
) -> Result<Value, ResourceError> {
    let resources = catalog.list(ResourceKind::Image)?;
    let res = obj_from_id(config, &resources, ResourceKind::Image.typename())?;
    Ok(Value::String(res.name.clone()))
}

pub type TransformFn = fn(&dyn ResourceCatalog, &Value) -> Result<Value, ResourceError>;

pub struct ResourceTypeRegistry {
    types: BTreeMap<String, TransformFn>,
}

impl Default for ResourceTypeRegistry {
    fn default() -> Self {
        let mut reg = Self::empty();
        reg.register("glance_image", glance_image);
        reg.register("nova_flavor", nova_flavor);
        reg.register("neutron_network", neutron_network);
        reg.register("cinder_volume_type", cinder_volume_type);
        reg.register("glance_image_name", glance_image_name);
        reg
    }
}

impl ResourceTypeRegistry {
    pub fn empty() -> Self {
        Self {
            types: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, tag: &str, transform: TransformFn) {
        self.types.insert(tag.into(), transform);
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(|k| k.as_str())
    }

    pub fn transform(
        &self,
        tag: &str,
        catalog: &dyn ResourceCatalog,
        config: &Value,
    ) -> Result<Value, ResourceError> {
        match self.types.get(tag) {
            Some(transform) => transform(catalog, config),
            None => Err(ResourceError::UnknownType(tag.into())),
        }
    }
}

/// Returns `args` with every set argument named in `converters` replaced
/// by the transform of its resource type.
pub fn preprocess(
    converters: &BTreeMap<String, String>,
    registry: &ResourceTypeRegistry,
    catalog: &dyn ResourceCatalog,
    args: &Value,
) -> Result<Value, ResourceError> {
    if args.is_null() {
        return Ok(Value::Null);
    }
    let mut processed = args.clone();
    let map = processed.as_object_mut().ok_or_else(|| {
        ResourceError::InvalidArgument(format!(
            "scenario arguments must be a mapping, got {}",
            args
        ))
    })?;

    for (arg, tag) in converters.iter() {
        if let Some(config) = map.get_mut(arg) {
            if !is_set(config) {
                continue;
            }
            let transformed = registry.transform(tag, catalog, config)?;
            debug!("preprocess: {}={} -> {} ({})", arg, config, &transformed, tag);
            *config = transformed;
        }
    }
    Ok(processed)
}
