pub mod controller;
pub mod domain;
pub mod ports;

pub use controller::{AppController, ControllerSnapshot, FetchOutcome, FETCH_ERROR_MESSAGE};
pub use domain::{AppView, Joke, SlangTerm, User, VocabularyWord};
pub use ports::{JokeGenerationService, PortError, PortResult, StorageService};
