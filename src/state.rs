use crate::db::{DbPool, OrmConn};
use crate::events::EventSender;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub events: EventSender,
}
