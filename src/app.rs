// Application wiring
//
// Builds the services over a set of repositories and exposes them as an axum router.

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::appointments::{
    Appointment, AppointmentManager, AppointmentRepository, AppointmentRequest, AppointmentStatus,
};
use crate::availability::{AvailabilityReason, AvailabilityResult, AvailabilityService, SlotOccupancy};
use crate::bookings::{
    Booking, BookingConfirmation, BookingManager, BookingRepository, BookingStatus, CancelRequest,
    CreateBookingRequest, PaymentStatus, QuoteRepository, RescheduleRequest, ScheduleRequest,
    ServiceSnapshot,
};
use crate::catalog::{EmployeeRepository, ServiceRepository};
use crate::clock::Clock;
use crate::events::EventSink;
use crate::handlers;
use crate::metrics::PerformanceMetrics;
use crate::pricing::{
    LineItem, LineItemKind, PriceBreakdown, PricingEngine, PricingInput, PromoCodeRepository,
    QuoteCalculator, QuoteData,
};
use crate::rate_limit::SubmissionRateLimiter;
use crate::settings::{ConfigStore, SettingsStore};
use crate::store::{MemorySettingsStore, MemoryStore, PgSettingsStore, PgStore};
use crate::types::{ComplexityTier, PropertyType, SurfaceMaterial};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::calculate_quote,
        handlers::calculate_price,
        handlers::check_availability,
        handlers::available_slots,
        handlers::next_available_slot,
        handlers::create_booking,
        handlers::reschedule_booking,
        handlers::cancel_booking,
        handlers::confirm_booking,
        handlers::complete_booking,
        handlers::create_appointment,
        handlers::reschedule_appointment,
        handlers::cancel_appointment,
        handlers::available_employees,
        handlers::get_setting,
        handlers::update_setting,
        handlers::get_metrics,
    ),
    components(schemas(
        PricingInput,
        PriceBreakdown,
        LineItem,
        LineItemKind,
        QuoteData,
        PropertyType,
        SurfaceMaterial,
        ComplexityTier,
        AvailabilityResult,
        AvailabilityReason,
        ScheduleRequest,
        CreateBookingRequest,
        RescheduleRequest,
        CancelRequest,
        Booking,
        BookingStatus,
        PaymentStatus,
        ServiceSnapshot,
        BookingConfirmation,
        AppointmentRequest,
        Appointment,
        AppointmentStatus,
    )),
    tags(
        (name = "pricing", description = "Quote and dynamic price calculation"),
        (name = "availability", description = "Slot checks and slot search"),
        (name = "bookings", description = "Booking lifecycle"),
        (name = "appointments", description = "Employee-assigned appointments"),
        (name = "admin", description = "Settings and metrics")
    ),
    info(
        title = "Cleaning Booking API",
        version = "0.1.0",
        description = "Pricing, availability and booking core for a cleaning-services business"
    )
)]
pub struct ApiDoc;

/// Every persistence seam the services depend on
#[derive(Clone)]
pub struct Repositories {
    pub settings: Arc<dyn SettingsStore>,
    pub services: Arc<dyn ServiceRepository>,
    pub employees: Arc<dyn EmployeeRepository>,
    pub quotes: Arc<dyn QuoteRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub occupancy: Arc<dyn SlotOccupancy>,
    pub appointments: Arc<dyn AppointmentRepository>,
    pub promos: Arc<dyn PromoCodeRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool.clone()));
        Self {
            settings: Arc::new(PgSettingsStore::new(pool)),
            services: store.clone(),
            employees: store.clone(),
            quotes: store.clone(),
            bookings: store.clone(),
            occupancy: store.clone(),
            appointments: store.clone(),
            promos: store,
        }
    }

    pub fn memory(store: Arc<MemoryStore>, settings: Arc<MemorySettingsStore>) -> Self {
        Self {
            settings,
            services: store.clone(),
            employees: store.clone(),
            quotes: store.clone(),
            bookings: store.clone(),
            occupancy: store.clone(),
            appointments: store.clone(),
            promos: store,
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub quote_calculator: Arc<QuoteCalculator>,
    pub pricing_engine: Arc<PricingEngine>,
    pub availability: Arc<AvailabilityService>,
    pub bookings: Arc<BookingManager>,
    pub appointments: Arc<AppointmentManager>,
    pub config_store: Arc<ConfigStore>,
    pub metrics: Arc<PerformanceMetrics>,
    pub rate_limiter: Arc<SubmissionRateLimiter>,
}

impl AppState {
    pub fn new(repos: Repositories, events: Arc<dyn EventSink>, clock: Arc<dyn Clock>) -> Self {
        let metrics = Arc::new(PerformanceMetrics::new());
        let config_store = Arc::new(ConfigStore::with_metrics(
            repos.settings.clone(),
            metrics.clone(),
        ));

        let quote_calculator = Arc::new(
            QuoteCalculator::new(config_store.clone(), repos.services.clone(), clock.clone())
                .with_metrics(metrics.clone()),
        );
        let pricing_engine = Arc::new(
            PricingEngine::new(
                config_store.clone(),
                repos.services.clone(),
                repos.bookings.clone(),
                repos.promos.clone(),
                clock.clone(),
            )
            .with_metrics(metrics.clone()),
        );
        let availability = Arc::new(
            AvailabilityService::new(config_store.clone(), repos.occupancy.clone(), clock.clone())
                .with_metrics(metrics.clone()),
        );
        let bookings = Arc::new(BookingManager::new(
            repos.bookings.clone(),
            repos.quotes.clone(),
            repos.services.clone(),
            availability.clone(),
            config_store.clone(),
            events.clone(),
            clock.clone(),
        ));
        let appointments = Arc::new(AppointmentManager::new(
            repos.appointments.clone(),
            repos.employees.clone(),
            repos.services.clone(),
            availability.clone(),
            config_store.clone(),
            events,
            clock,
        ));

        Self {
            quote_calculator,
            pricing_engine,
            availability,
            bookings,
            appointments,
            config_store,
            metrics,
            rate_limiter: Arc::new(SubmissionRateLimiter::new()),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/quotes/calculate", post(handlers::calculate_quote))
        .route("/api/pricing/calculate", post(handlers::calculate_price))
        .route("/api/availability/check", get(handlers::check_availability))
        .route("/api/availability/slots", get(handlers::available_slots))
        .route("/api/availability/next", get(handlers::next_available_slot))
        .route("/api/bookings", post(handlers::create_booking))
        .route("/api/bookings/:id/reschedule", post(handlers::reschedule_booking))
        .route("/api/bookings/:id/cancel", post(handlers::cancel_booking))
        .route("/api/bookings/:id/confirm", post(handlers::confirm_booking))
        .route("/api/bookings/:id/complete", post(handlers::complete_booking))
        .route("/api/appointments", post(handlers::create_appointment))
        .route(
            "/api/appointments/employees",
            get(handlers::available_employees),
        )
        .route(
            "/api/appointments/:id/reschedule",
            post(handlers::reschedule_appointment),
        )
        .route("/api/appointments/:id/cancel", post(handlers::cancel_appointment))
        .route(
            "/api/settings/:key",
            get(handlers::get_setting).put(handlers::update_setting),
        )
        .route("/api/metrics", get(handlers::get_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
