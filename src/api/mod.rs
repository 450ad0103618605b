pub mod deck_routes;
pub mod deck_websocket;
