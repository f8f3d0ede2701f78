mod goals;
mod helpers;
mod log;
mod summary;
mod user;

pub(crate) use goals::{
    cmd_goals_recalc, cmd_goals_set_calories, cmd_goals_set_type, cmd_goals_set_weight,
    cmd_goals_show,
};
pub(crate) use log::{Nutrients, cmd_delete, cmd_log};
pub(crate) use summary::{HistoryRange, cmd_day, cmd_history, cmd_totals};
pub(crate) use user::{
    CreateUserArgs, cmd_user_create, cmd_user_delete, cmd_user_metrics, cmd_user_show,
};
