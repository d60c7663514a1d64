pub mod google_books;
pub mod igdb;
pub mod mercadopago;
pub mod stripe;
pub mod throttle;
pub mod tmdb;
