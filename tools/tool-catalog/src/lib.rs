pub mod domain {
    pub mod description;
    pub mod registration;
    pub mod revision;
    pub mod schema;
}

pub mod app {
    pub mod introspector;
    pub mod negotiator;
    pub mod registry;
    pub mod tool_list;
}

pub mod adapters {
    pub mod demo_tools;
    pub mod json_schema;
    pub mod server;
}

pub mod infra {
    pub mod config;
    pub mod metrics;
}

pub mod shared {
    pub mod error;
    pub mod types;
}
