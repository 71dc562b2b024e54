use crate::errors::ServiceError;
use validator::Validate;

/// Validates a request payload, collecting field errors into one message.
pub fn validate_input<T: Validate>(payload: &T) -> Result<(), ServiceError> {
    payload.validate().map_err(|e| {
        let details: Vec<String> = e
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |err| {
                    err.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field))
                })
            })
            .collect();
        ServiceError::ValidationError(details.join("; "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 3, message = "Name too short"))]
        name: String,
    }

    #[test]
    fn collects_field_messages() {
        let err = validate_input(&Sample { name: "ab".into() }).unwrap_err();
        match err {
            ServiceError::ValidationError(msg) => assert!(msg.contains("Name too short")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn passes_valid_payload() {
        assert!(validate_input(&Sample { name: "abc".into() }).is_ok());
    }
}
