use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::config::{EndpointConfig, ReceiverSettings, SenderSettings, Settings};
use crate::domain::HttpMethod;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Cross-reference error: {0}")]
    CrossReference(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_receiver(&settings.receiver) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_sender(&settings.sender) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_endpoints("receiver", &settings.receiver_endpoints) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_endpoints("sender", &settings.sender_endpoints) {
            errors.extend(e);
        }

        if settings.engine.max_depth == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "engine.max_depth".to_string(),
                reason: "Depth limit must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_receiver(receiver: &ReceiverSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        check_address("receiver", &receiver.host, receiver.port, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_sender(sender: &SenderSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        check_address("sender", &sender.host, sender.port, &mut errors);

        if sender.target_host.is_empty() {
            errors.push(ValidationError::MissingField("sender.target_host".to_string()));
        }
        if sender.target_port == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "sender.target_port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }
        if sender.timeout_seconds == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "sender.timeout_seconds".to_string(),
                reason: "Timeout must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_endpoints(
        side: &str,
        endpoints: &[EndpointConfig],
    ) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut seen_routes = HashMap::new();

        for (idx, endpoint) in endpoints.iter().enumerate() {
            let field = format!("{}_endpoints[{}]", side, idx);

            if endpoint.url.is_empty() {
                errors.push(ValidationError::MissingField(format!("{}.url", field)));
            } else if !endpoint.url.starts_with('/') {
                errors.push(ValidationError::InvalidValue {
                    field: format!("{}.url", field),
                    reason: format!("'{}' must start with '/'", endpoint.url),
                });
            }

            match endpoint.method.parse::<HttpMethod>() {
                Ok(method) => {
                    let route = format!("{} {}", method, endpoint.url);
                    if let Some(prev_idx) = seen_routes.insert(route.clone(), idx) {
                        errors.push(ValidationError::Duplicate(format!(
                            "Route '{}' appears at {} indices {} and {}",
                            route, side, prev_idx, idx
                        )));
                    }
                }
                Err(e) => errors.push(ValidationError::InvalidValue {
                    field: format!("{}.method", field),
                    reason: e.to_string(),
                }),
            }

            Self::validate_body_fields(&field, endpoint, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Every `parentProperty` must name a field of the same document
    fn validate_body_fields(
        field: &str,
        endpoint: &EndpointConfig,
        errors: &mut Vec<ValidationError>,
    ) {
        let names: HashSet<&str> = endpoint.body_fields.iter().map(|f| f.name.as_str()).collect();

        for (idx, body_field) in endpoint.body_fields.iter().enumerate() {
            if body_field.name.is_empty() {
                errors.push(ValidationError::MissingField(format!(
                    "{}.bodyFields[{}].name",
                    field, idx
                )));
            }
            if let Some(parent) = &body_field.parent_property {
                if !names.contains(parent.as_str()) {
                    errors.push(ValidationError::CrossReference(format!(
                        "{}.bodyFields[{}] references unknown parent '{}'",
                        field, idx, parent
                    )));
                }
            }
        }
    }
}

fn check_address(section: &str, host: &str, port: u16, errors: &mut Vec<ValidationError>) {
    if host.is_empty() {
        errors.push(ValidationError::MissingField(format!("{}.host", section)));
    }
    if port == 0 {
        errors.push(ValidationError::InvalidValue {
            field: format!("{}.port", section),
            reason: "Port must be greater than 0".to_string(),
        });
    }
}
