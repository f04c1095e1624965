use std::collections::BTreeMap;

use serde_json::{json, Value};

use super::command_registry::{
    CommandSpec, DRAG_COMMAND, NO_ARG_COMMANDS, RAW_ARG_COMMANDS, SINGLE_PATH_COMMANDS,
    WHEEL_COMMAND,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    pub prompt: Option<String>,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            prompt: None,
            command_args: BTreeMap::new(),
        }
    }

    fn invalid(command: &str, raw: &str, error: String) -> Self {
        let mut intent = Intent::new("invalid", raw);
        intent
            .command_args
            .insert("command".to_string(), Value::String(command.to_string()));
        intent
            .command_args
            .insert("error".to_string(), Value::String(error));
        intent
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn parse_path_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn parse_single_path_arg(arg: &str) -> String {
    let parts = parse_path_args(arg);
    match parts.len() {
        0 => String::new(),
        1 => parts[0].clone(),
        _ => parts.join(" "),
    }
}

fn parse_numbers(arg: &str, expected: usize) -> Result<Vec<f64>, String> {
    let values = arg
        .split(|ch: char| ch.is_whitespace() || ch == ',')
        .filter(|value| !value.is_empty())
        .map(|value| {
            value
                .parse::<f64>()
                .ok()
                .filter(|number| number.is_finite())
                .ok_or_else(|| format!("'{value}' is not a number"))
        })
        .collect::<Result<Vec<f64>, String>>()?;
    if values.len() != expected {
        return Err(format!("expected {expected} numbers, got {}", values.len()));
    }
    Ok(values)
}

pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop", text);
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let remainder = &slash_tail[command_len..];
            let arg = if remainder.is_empty() {
                ""
            } else {
                remainder.trim()
            };

            if let Some(action) = find_action(&command, RAW_ARG_COMMANDS) {
                let key = match action {
                    "set_reference_policy" => "policy",
                    "enhance" => "prompt",
                    "quick_action" => "label",
                    _ => "model",
                };
                let mut intent = Intent::new(action, text);
                intent
                    .command_args
                    .insert(key.to_string(), Value::String(arg.to_string()));
                return intent;
            }

            if let Some(action) = find_action(&command, SINGLE_PATH_COMMANDS) {
                let mut intent = Intent::new(action, text);
                intent.command_args.insert(
                    "path".to_string(),
                    Value::String(parse_single_path_arg(arg)),
                );
                return intent;
            }

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return Intent::new(action, text);
            }

            if command == WHEEL_COMMAND.command {
                return match parse_numbers(arg, 1) {
                    Ok(values) => {
                        let mut intent = Intent::new(WHEEL_COMMAND.action, text);
                        intent
                            .command_args
                            .insert("delta_y".to_string(), json!(values[0]));
                        intent
                    }
                    Err(error) => Intent::invalid(&command, text, error),
                };
            }

            if command == DRAG_COMMAND.command {
                return match parse_numbers(arg, 4) {
                    Ok(values) => {
                        let mut intent = Intent::new(DRAG_COMMAND.action, text);
                        intent
                            .command_args
                            .insert("from".to_string(), json!([values[0], values[1]]));
                        intent
                            .command_args
                            .insert("to".to_string(), json!([values[2], values[3]]));
                        intent
                    }
                    Err(error) => Intent::invalid(&command, text, error),
                };
            }

            let mut intent = Intent::new("unknown", text);
            intent
                .command_args
                .insert("command".to_string(), Value::String(command));
            intent
                .command_args
                .insert("arg".to_string(), Value::String(arg.to_string()));
            return intent;
        }
    }

    let mut intent = Intent::new("send", text);
    intent.prompt = Some(raw_trimmed.to_string());
    intent
}
