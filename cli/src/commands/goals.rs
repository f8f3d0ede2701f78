use anyhow::Result;

use bite_core::LedgerService;
use bite_core::db::GoalSync;
use bite_core::models::{GoalProfile, GoalType};

fn print_goals(goals: &GoalProfile) {
    let goal = goals.goal_type;
    let cal = goals.target_calories;
    let pg = goals.target_protein_g;
    let cg = goals.target_carbs_g;
    let fg = goals.target_fat_g;
    println!("Goal: {goal}  {cal} kcal/day");
    println!("  Protein: {pg:.0}g  Carbs: {cg:.0}g  Fat: {fg:.0}g");
    if let Some(w) = goals.target_weight_kg {
        println!("  Target weight: {w:.1} kg");
    }
}

fn emit(goals: &GoalProfile, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(goals)?);
    } else {
        print_goals(goals);
    }
    Ok(())
}

pub(crate) fn cmd_goals_show(svc: &LedgerService, user_id: i64, json: bool) -> Result<()> {
    let (goals, state) = svc.load_goals(user_id)?;
    if !json {
        match state {
            GoalSync::Synced => {}
            GoalSync::Materialized => eprintln!("Note: goal record created from profile"),
            GoalSync::Repaired => {
                eprintln!("Note: goal record was out of sync and has been repaired")
            }
        }
    }
    emit(&goals, json)
}

pub(crate) fn cmd_goals_set_calories(
    svc: &LedgerService,
    user_id: i64,
    calories: i64,
    json: bool,
) -> Result<()> {
    let goals = svc.set_calorie_goal(user_id, calories)?;
    emit(&goals, json)
}

pub(crate) fn cmd_goals_set_type(
    svc: &LedgerService,
    user_id: i64,
    goal: &str,
    json: bool,
) -> Result<()> {
    let goal_type = GoalType::parse(goal)?;
    let goals = svc.set_goal_type(user_id, goal_type)?;
    emit(&goals, json)
}

pub(crate) fn cmd_goals_set_weight(
    svc: &LedgerService,
    user_id: i64,
    weight_kg: f64,
    json: bool,
) -> Result<()> {
    let goals = svc.set_target_weight(user_id, weight_kg)?;
    emit(&goals, json)
}

pub(crate) fn cmd_goals_recalc(svc: &LedgerService, user_id: i64, json: bool) -> Result<()> {
    let goals = svc.recalculate_calorie_goal(user_id)?;
    emit(&goals, json)
}
