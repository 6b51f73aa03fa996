// Copyright (c) Facebook, Inc. and its affiliates.
//
// Order-insensitive canonical strings for workload configs. Two configs
// which differ only in the order of list items or map keys, or in
// surrounding whitespace of strings, canonicalize identically and thus
// share a hash.
//
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum CanonError {
    #[error("canonicalization takes exactly one value, got {0}")]
    Arity(usize),
    #[error("{0} values can't be canonicalized")]
    Unsupported(&'static str),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConfigValue {
    None,
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(String),
    List(Vec<ConfigValue>),
    Tuple(Vec<ConfigValue>),
    Map(Vec<(ConfigValue, ConfigValue)>),
    Set(Vec<ConfigValue>),
}

/// Floats keep a fractional part or an exponent so that 42.0 and 42 stay
/// distinguishable.
fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".into();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.into();
    }

    let abs = v.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let sci = format!("{:e}", v);
        return match sci.split_once('e') {
            Some((mant, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exp),
                };
                format!("{}e{}{:0>2}", mant, sign, digits)
            }
            None => sci,
        };
    }

    if v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

impl ConfigValue {
    pub fn canonical(&self) -> Result<String, CanonError> {
        Ok(match self {
            Self::None => "None".into(),
            Self::Bool(true) => "True".into(),
            Self::Bool(false) => "False".into(),
            Self::Int(v) => v.to_string(),
            Self::Float(v) => format_float(*v),
            Self::Str(s) => s.trim().to_string(),
            Self::List(items) | Self::Tuple(items) => {
                let mut strs = items
                    .iter()
                    .map(|item| item.canonical())
                    .collect::<Result<Vec<String>, CanonError>>()?;
                strs.sort();
                strs.join(",")
            }
            Self::Map(pairs) => {
                let mut strs = pairs
                    .iter()
                    .map(|(k, v)| -> Result<String, CanonError> {
                        Ok(format!("{}:{}", k.canonical()?, v.canonical()?))
                    })
                    .collect::<Result<Vec<String>, CanonError>>()?;
                strs.sort();
                strs.join("|")
            }
            Self::Set(_) => return Err(CanonError::Unsupported("set")),
        })
    }
}

impl From<&Value> for ConfigValue {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => Self::None,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i as i128)
                } else if let Some(u) = n.as_u64() {
                    Self::Int(u as i128)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Self::Str(s.clone()),
            Value::Array(items) => Self::List(items.iter().map(Self::from).collect()),
            Value::Object(map) => Self::Map(
                map.iter()
                    .map(|(k, v)| (Self::Str(k.clone()), Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for ConfigValue {
    fn from(v: Value) -> Self {
        Self::from(&v)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        Self::Str(s.into())
    }
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        Self::Int(v as i128)
    }
}

impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

/// Canonical string of the single value in `args`.
pub fn canonicalize(args: &[ConfigValue]) -> Result<String, CanonError> {
    match args {
        [v] => v.canonical(),
        _ => Err(CanonError::Arity(args.len())),
    }
}

/// Lowercase hex MD5 of the canonical string.
pub fn config_hash(v: &ConfigValue) -> Result<String, CanonError> {
    let canon = v.canonical()?;
    Ok(format!("{:x}", md5::compute(canon.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn list(items: Vec<ConfigValue>) -> ConfigValue {
        ConfigValue::List(items)
    }

    #[test]
    fn test_canonicalize() {
        use ConfigValue::*;

        for (input, result) in vec![
            (None, "None"),
            (Str("".into()), ""),
            (Str(" str value ".into()), "str value"),
            (Str(" 42 ".into()), "42"),
            (42i64.into(), "42"),
            (42.0f64.into(), "42.0"),
            (Bool(true), "True"),
            (
                list(vec![3.2f64.into(), 1i64.into(), " foo ".into(), None]),
                "1,3.2,None,foo",
            ),
            (
                Tuple(vec![" def".into(), "abc".into(), list(vec![22i64.into(), 33i64.into()])]),
                "22,33,abc,def",
            ),
            (Map(vec![]), ""),
            (
                Map(vec![(1i64.into(), 2i64.into()), ("a".into(), " b c ".into())]),
                "1:2|a:b c",
            ),
            (
                Map(vec![
                    ("foo".into(), "bar".into()),
                    (
                        Tuple(vec![1i64.into(), 2i64.into()]),
                        list(vec![5i64.into(), 4i64.into(), 3i64.into()]),
                    ),
                ]),
                "1,2:3,4,5|foo:bar",
            ),
        ] {
            let canon = canonicalize(&[input.clone()]).unwrap();
            println!("{:?} -> {:?} ({:?})", &input, &canon, result);
            assert_eq!(canon, result);
        }
    }

    #[test]
    fn test_canonicalize_errors() {
        assert!(matches!(
            canonicalize(&[ConfigValue::Int(1), ConfigValue::Int(2)]),
            Err(CanonError::Arity(2))
        ));
        assert!(matches!(canonicalize(&[]), Err(CanonError::Arity(0))));
        assert!(matches!(
            canonicalize(&[ConfigValue::Set(vec![])]),
            Err(CanonError::Unsupported(_))
        ));
        assert!(canonicalize(&[list(vec![ConfigValue::Set(vec![])])]).is_err());
    }

    #[test]
    fn test_format_float() {
        for (v, result) in &[
            (3.2, "3.2"),
            (-7.0, "-7.0"),
            (0.0, "0.0"),
            (1e16, "1e+16"),
            (1.5e-5, "1.5e-05"),
            (f64::INFINITY, "inf"),
        ] {
            assert_eq!(&format_float(*v), result);
        }
    }

    #[test]
    fn test_from_json() {
        let v = ConfigValue::from(json!({"b": [3, 1.5, null], "a": " x "}));
        assert_eq!(v.canonical().unwrap(), "a:x|b:1.5,3,None");
    }

    #[test]
    fn test_config_hash() {
        assert_eq!(
            config_hash(&ConfigValue::Map(vec![])).unwrap(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );

        let a = ConfigValue::from(json!({"args": {"x": 1, "y": [1, 2]}, "runner": "constant"}));
        let b = ConfigValue::from(json!({"runner": " constant ", "args": {"y": [2, 1], "x": 1}}));
        let c = ConfigValue::from(json!({"runner": "constant", "args": {"y": [2, 1], "x": 2}}));
        assert_eq!(config_hash(&a).unwrap(), config_hash(&b).unwrap());
        assert_ne!(config_hash(&a).unwrap(), config_hash(&c).unwrap());
        assert_eq!(config_hash(&a).unwrap().len(), 32);
    }
}
