mod validator;

pub use validator::{
    RequestValidator, ValidationError, ADDRESS_FIELD, BODY_FIELD, COORDINATES_FIELD,
};
