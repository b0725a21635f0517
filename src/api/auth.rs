// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use reqwest::Method;
use secrecy::{ExposeSecret as _, SecretString};
use serde_json::json;

use super::{
    model::{AuthResponse, Role},
    Executor, Request,
};

pub(crate) struct Register {
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) password: SecretString,
    pub(crate) role: Option<Role>,
}

impl From<Register> for Request {
    fn from(value: Register) -> Self {
        let mut body = json!({
            "name": value.name,
            "email": value.email,
            "password": value.password.expose_secret(),
        });
        if let Some(role) = value.role {
            body["role"] = json!(role);
        }
        Self::new(Method::POST, ["auth", "register"]).with_json(body)
    }
}

impl Executor for Register {
    type Response = AuthResponse;
}

pub(crate) struct Login {
    pub(crate) email: String,
    pub(crate) password: SecretString,
}

impl From<Login> for Request {
    fn from(value: Login) -> Self {
        Self::new(Method::POST, ["auth", "login"]).with_json(json!({
            "email": value.email,
            "password": value.password.expose_secret(),
        }))
    }
}

impl Executor for Login {
    type Response = AuthResponse;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_omits_unset_role() {
        let req: Request = Register {
            name: "Asha".to_owned(),
            email: "asha@example.com".to_owned(),
            password: SecretString::new("hunter22".to_owned()),
            role: None,
        }
        .into();

        assert_eq!(req.method(), &Method::POST);
        assert_eq!(req.path(), ["auth", "register"]);
        assert_eq!(
            req.body(),
            &Some(json!({
                "name": "Asha",
                "email": "asha@example.com",
                "password": "hunter22",
            }))
        );
    }

    #[test]
    fn register_sends_role_in_wire_form() {
        let req: Request = Register {
            name: "Asha".to_owned(),
            email: "asha@example.com".to_owned(),
            password: SecretString::new("hunter22".to_owned()),
            role: Some(Role::Partner),
        }
        .into();

        assert_eq!(
            req.body().as_ref().and_then(|body| body.get("role")),
            Some(&json!("PARTNER"))
        );
    }
}
