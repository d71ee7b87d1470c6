//! Assembly script syntax
//!
//! ```text
//! # comment
//! robot <name>
//! component <name> box <length> <width> <height> [at x y z] [rot rx ry rz] [mass kg]
//! component <name> cylinder <radius> <height>   [at x y z] [rot rx ry rz] [mass kg]
//! component <name> sphere <radius>              [at x y z] [rot rx ry rz] [mass kg]
//! ```
//!
//! Parsing checks syntax only. Semantic checks (non-empty, unique names,
//! positive dimensions) happen when the geometry kernel materializes the
//! script.

use thiserror::Error;

use crate::geometry::{Component, GeometricModel, Placement, Primitive};

/// Robot name used when a script does not declare one
pub const DEFAULT_ROBOT_NAME: &str = "aeroforge_robot";

/// First syntax problem found in a script
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

impl ScriptError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Parsed script
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    pub robot: Option<String>,
    pub components: Vec<Component>,
}

impl Script {
    pub fn into_model(self) -> GeometricModel {
        GeometricModel {
            name: self.robot.unwrap_or_else(|| DEFAULT_ROBOT_NAME.to_string()),
            components: self.components,
        }
    }
}

/// Syntax-level validation
pub fn validate(source: &str) -> Result<(), ScriptError> {
    parse(source).map(|_| ())
}

pub fn parse(source: &str) -> Result<Script, ScriptError> {
    let mut script = Script::default();

    for (index, raw) in source.lines().enumerate() {
        let line_no = index + 1;
        let code = raw.split('#').next().unwrap_or("").trim();
        if code.is_empty() {
            continue;
        }

        let tokens: Vec<&str> = code.split_whitespace().collect();
        match tokens[0] {
            "robot" => {
                if tokens.len() != 2 {
                    return Err(ScriptError::new(line_no, "expected 'robot <name>'"));
                }
                if script.robot.is_some() {
                    return Err(ScriptError::new(line_no, "robot declared twice"));
                }
                script.robot = Some(identifier(tokens[1], line_no)?.to_string());
            }
            "component" => script.components.push(parse_component(&tokens[1..], line_no)?),
            other => return Err(ScriptError::new(line_no, format!("unknown statement '{}'", other))),
        }
    }

    Ok(script)
}

fn parse_component(tokens: &[&str], line_no: usize) -> Result<Component, ScriptError> {
    let [name, shape, rest @ ..] = tokens else {
        return Err(ScriptError::new(line_no, "expected 'component <name> <shape> ...'"));
    };
    let name = identifier(name, line_no)?;

    let arity = match *shape {
        "box" => 3,
        "cylinder" => 2,
        "sphere" => 1,
        other => return Err(ScriptError::new(line_no, format!("unknown shape '{}'", other))),
    };
    if rest.len() < arity {
        return Err(ScriptError::new(
            line_no,
            format!("{} needs {} dimensions, got {}", shape, arity, rest.len()),
        ));
    }
    let dims = numbers(&rest[..arity], line_no)?;
    let primitive = match *shape {
        "box" => Primitive::Box {
            length: dims[0],
            width: dims[1],
            height: dims[2],
        },
        "cylinder" => Primitive::Cylinder {
            radius: dims[0],
            height: dims[1],
        },
        _ => Primitive::Sphere { radius: dims[0] },
    };

    let mut component = Component::new(name, primitive, Placement::default());
    let mut seen: Vec<&str> = Vec::new();
    let mut cursor = &rest[arity..];
    while let [modifier, tail @ ..] = cursor {
        if seen.contains(modifier) {
            return Err(ScriptError::new(line_no, format!("'{}' given twice", modifier)));
        }
        let count = match *modifier {
            "at" | "rot" => 3,
            "mass" => 1,
            other => return Err(ScriptError::new(line_no, format!("unexpected token '{}'", other))),
        };
        if tail.len() < count {
            return Err(ScriptError::new(line_no, format!("'{}' needs {} values", modifier, count)));
        }
        let values = numbers(&tail[..count], line_no)?;
        match *modifier {
            "at" => component.placement.position = [values[0], values[1], values[2]],
            "rot" => component.placement.rotation_deg = [values[0], values[1], values[2]],
            _ => component.mass_kg = Some(values[0]),
        }
        seen.push(*modifier);
        cursor = &tail[count..];
    }

    Ok(component)
}

fn identifier<'a>(token: &'a str, line_no: usize) -> Result<&'a str, ScriptError> {
    if token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        Ok(token)
    } else {
        Err(ScriptError::new(line_no, format!("invalid name '{}'", token)))
    }
}

fn numbers(tokens: &[&str], line_no: usize) -> Result<Vec<f64>, ScriptError> {
    tokens
        .iter()
        .map(|t| match t.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(ScriptError::new(line_no, format!("'{}' is not a number", t))),
        })
        .collect()
}
