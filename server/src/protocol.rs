use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    NewGame,
    Play { cards: Vec<String> },
    Pass,
    Ping,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    Welcome {
        seat: usize,
        seat_names: Vec<String>,
    },
    GameStarted {
        session_id: String,
        starter: usize,
    },
    SeatActions {
        actions: Vec<SeatAction>,
    },
    TableState(TableSnapshot),
    PlayRejected {
        reason: String,
    },
    GameOver {
        session_id: String,
        winner: usize,
        winner_name: String,
    },
    Error {
        message: String,
    },
    Pong,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatInfo {
    pub seat: usize,
    pub name: String,
    pub hand_count: usize,
    pub is_human: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayView {
    pub seat: usize,
    pub cards: Vec<String>,
    pub kind: String,
    pub rank: String,
    pub size: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryView {
    pub seat: usize,
    pub name: String,
    pub passed: bool,
    pub cards: Vec<String>,
}

/// One seat's move as shown to the human, with the engine's reasoning for
/// computer seats.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatAction {
    pub seat: usize,
    pub name: String,
    pub passed: bool,
    pub cards: Vec<String>,
    pub shape: Option<String>,
    pub counts: Vec<usize>,
    pub reasoning: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub session_id: String,
    pub seats: Vec<SeatInfo>,
    pub turn: usize,
    pub last_play: Option<PlayView>,
    pub your_hand: Vec<String>,
    pub winner: Option<usize>,
    pub history: Vec<HistoryView>,
    pub is_free: bool,
    pub first_turn: bool,
}
