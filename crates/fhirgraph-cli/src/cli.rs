use clap::Parser;

#[derive(Parser)]
#[command(name = "fhirgraph")]
#[command(about = "Populate a Neo4j database with the resources of a FHIR server")]
#[command(version)]
pub struct Cli {
    /// Bolt URI of the Neo4j database, e.g. neo4j://localhost:7687
    #[arg(long, env = "FHIRGRAPH_NEO4J_URI", value_name = "URI")]
    pub neo4j: String,

    /// Neo4j username
    #[arg(long, env = "FHIRGRAPH_NEO4J_USER", default_value = "neo4j")]
    pub neo4j_user: String,

    /// Neo4j password
    #[arg(long, env = "FHIRGRAPH_NEO4J_PASSWORD")]
    pub neo4j_password: String,

    /// Name of the Neo4j database to use
    #[arg(long, env = "FHIRGRAPH_NEO4J_DATABASE", default_value = "neo4j")]
    pub neo4j_database: String,

    /// Base URL of the FHIR server, e.g. http://localhost:8080/fhir
    #[arg(long, env = "FHIRGRAPH_FHIR_SERVER", value_name = "URL")]
    pub fhir_server: Option<String>,

    /// FHIR resource type(s) to transform, in the given order
    #[arg(short = 'r', long = "resource", value_name = "TYPE")]
    pub resources: Vec<String>,

    /// Delete all database content before transforming (no confirmation!)
    #[arg(short = 'd', long)]
    pub delete: bool,

    /// Search the database for unresolved references and try to resolve them
    #[arg(long)]
    pub resolve: bool,

    /// Ask the server for N resources per page
    #[arg(long, value_name = "N", default_value_t = 250,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub page_size: u32,

    /// Limit the number of resources to receive per resource type
    #[arg(long, value_name = "N")]
    pub limit: Option<u64>,

    /// Turn structural validation of fetched resources off
    #[arg(long)]
    pub no_validation: bool,

    /// Abort a type's transform on the first validation or mapping failure
    #[arg(long)]
    pub strict: bool,

    /// Transform resource types concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Log level: error, warn, info, debug or trace
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    pub log: String,
}
