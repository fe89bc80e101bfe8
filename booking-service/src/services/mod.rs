pub mod currency;
pub mod dispatcher;
pub mod metrics;
pub mod reconciler;
pub mod repository;
pub mod stripe;

pub use currency::CurrencyNormalizer;
pub use dispatcher::EventDispatcher;
pub use reconciler::BookingReconciler;
pub use repository::BookingRepository;
pub use stripe::StripeClient;
