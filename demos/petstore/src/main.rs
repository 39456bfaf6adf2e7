//! Petstore demo
//!
//! Hand-written stand-in for the code a generator emits from the classic
//! Petstore description: endpoint types, their registry, and a client family.

// Demo-specific lint allowances
#![allow(missing_docs)]
#![allow(clippy::print_stdout)]

use std::sync::LazyLock;

use gimlet::prelude::*;
use gimlet::serde_json;

// ============================================================================
// Data Types
// ============================================================================

/// A pet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pet {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// Body of `createPets`.
#[derive(Debug, Clone, Serialize)]
pub struct NewPet {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

// ============================================================================
// Endpoints
// ============================================================================

endpoint! {
    /// List all pets. Accepts a `limit` query parameter.
    pub struct ListPets => Get "/pets";
}

endpoint! {
    /// Create a pet.
    pub struct CreatePets => Post "/pets";
}

endpoint! {
    /// Info for a specific pet. The `petId` param fills the path.
    pub struct ShowPetById => Get "/pets/{petId}";
}

// ============================================================================
// Registry
// ============================================================================

/// Every operation of the `petstore` namespace, by operation id.
pub static PETSTORE: LazyLock<EndpointFactory> = LazyLock::new(|| {
    EndpointFactory::new("petstore")
        .register("listPets", || Box::new(ListPets::default()))
        .register("createPets", || Box::new(CreatePets::default()))
        .register("showPetById", || Box::new(ShowPetById::default()))
});

// ============================================================================
// Client
// ============================================================================

/// Petstore client.
#[derive(Debug, Clone)]
pub struct PetstoreClient {
    connection: Connection,
    endpoints: EndpointFactory,
}

impl ClientFamily for PetstoreClient {
    fn endpoint_factory() -> EndpointFactory {
        PETSTORE.clone()
    }

    fn from_parts(connection: Connection, endpoints: EndpointFactory) -> Self {
        Self {
            connection,
            endpoints,
        }
    }
}

impl PetstoreClient {
    /// Fresh endpoint for an operation id.
    pub fn endpoint(&self, operation: &str) -> Result<Box<dyn Endpoint>> {
        self.endpoints.create(operation)
    }

    /// Send any endpoint.
    pub async fn perform(&self, endpoint: &dyn Endpoint) -> Result<StructuredResponse> {
        self.connection.perform(endpoint).await
    }

    /// `GET /pets`
    pub async fn list_pets(&self, limit: Option<u32>) -> Result<Vec<Pet>> {
        let mut endpoint = self.endpoint("listPets")?;
        if let Some(limit) = limit {
            endpoint.set_param("limit", limit.to_string());
        }
        self.perform(endpoint.as_ref()).await?.json()
    }

    /// `POST /pets`
    pub async fn create_pet(&self, pet: &NewPet) -> Result<Pet> {
        let body = serde_json::to_value(pet)
            .map_err(|e| Error::encoding("application/json", e.to_string()))?;
        let mut endpoint = self.endpoint("createPets")?;
        endpoint.set_body(body);
        self.perform(endpoint.as_ref()).await?.json()
    }

    /// `GET /pets/{petId}`
    pub async fn show_pet_by_id(&self, pet_id: u64) -> Result<Pet> {
        let mut endpoint = self.endpoint("showPetById")?;
        endpoint.set_param("petId", pet_id.to_string());
        self.perform(endpoint.as_ref()).await?.json()
    }
}

// ============================================================================
// Main: Demonstrate usage
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let host = std::env::var("PETSTORE_HOST")
        .unwrap_or_else(|_| "http://petstore.swagger.io/v1".to_string());

    let petstore = PetstoreClient::builder()
        .host(&host)
        .logger(TracingSink)
        .tracer(TracingSink)
        .build()?;

    println!("Petstore client for {host}");
    println!("Operations: {}", PETSTORE.names().join(", "));

    match petstore.list_pets(Some(5)).await {
        Ok(pets) => {
            for pet in pets {
                println!("- #{} {}", pet.id, pet.name);
            }
        }
        Err(error) => println!("listPets failed: {error}"),
    }

    Ok(())
}

// ============================================================================
// Tests using wiremock
// ============================================================================
