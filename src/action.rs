use serde::{Deserialize, Serialize};
use strum::Display;

use crate::components::browser::BrowserAction;
use crate::components::settings::SettingsAction;

#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum GlobalAction {
    Tick,
    Render,
    Resize(u16, u16),
    Suspend,
    Resume,
    Quit,
    ClearScreen,
    Error(String),
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    Global(GlobalAction),
    Browser(BrowserAction),
    Settings(SettingsAction),
}

impl From<GlobalAction> for AppAction {
    fn from(action: GlobalAction) -> Self {
        AppAction::Global(action)
    }
}

impl From<BrowserAction> for AppAction {
    fn from(action: BrowserAction) -> Self {
        AppAction::Browser(action)
    }
}

impl From<SettingsAction> for AppAction {
    fn from(action: SettingsAction) -> Self {
        AppAction::Settings(action)
    }
}
