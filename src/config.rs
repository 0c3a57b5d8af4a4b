//! Generator configuration, read from a `codegen.toml` file.

use std::{path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

fn default_base_namespace() -> String {
    "Aws".to_string()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CodegenConfig {
    /// root namespace for every generated class
    #[serde(default = "default_base_namespace")]
    pub base_namespace: String,

    /// directory generated files are written under
    pub output_dir: PathBuf,

    /// services to generate
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// service name, used for the `<Name>Client` class and sub-namespace
    pub name: String,

    /// path to the service definition json
    pub definition: PathBuf,

    /// subset of operations to generate; empty means all
    #[serde(default)]
    pub operations: Vec<String>,
}

impl CodegenConfig {
    /// naming scheme for one configured service
    pub fn naming(&self, service: &ServiceConfig) -> ServiceNaming {
        ServiceNaming::new(&self.base_namespace, &service.name)
    }
}

impl FromStr for CodegenConfig {
    type Err = Error;

    fn from_str(content: &str) -> std::result::Result<CodegenConfig, Self::Err> {
        let config =
            toml::from_str(content).map_err(|e| Error::InvalidDefinition(format!("config: {}", e)))?;
        Ok(config)
    }
}

/// Derives the namespaces and client class name for one service.
#[derive(Clone, Debug)]
pub struct ServiceNaming {
    base_namespace: String,
    service: String,
}

impl ServiceNaming {
    pub fn new(base_namespace: &str, service: &str) -> Self {
        ServiceNaming {
            base_namespace: base_namespace.to_string(),
            service: service.to_string(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn client_namespace(&self) -> String {
        format!("{}\\{}", self.base_namespace, self.service)
    }

    pub fn client_class(&self) -> String {
        format!("{}Client", self.service)
    }

    pub fn client_fqcn(&self) -> String {
        format!("{}\\{}", self.client_namespace(), self.client_class())
    }

    pub fn input_namespace(&self) -> String {
        format!("{}\\Input", self.client_namespace())
    }

    pub fn result_namespace(&self) -> String {
        format!("{}\\Result", self.client_namespace())
    }
}
