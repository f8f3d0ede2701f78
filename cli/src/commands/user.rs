use anyhow::{Context, Result};
use chrono::NaiveDate;

use bite_core::LedgerService;
use bite_core::models::{GoalType, NewUser, UserProfile};

pub(crate) struct CreateUserArgs {
    pub username: String,
    pub gender: String,
    pub birthdate: String,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub activity: String,
    pub goal: String,
    pub calories: Option<i64>,
}

fn print_user(user: &UserProfile) {
    let UserProfile {
        id,
        username,
        gender,
        birthdate,
        height_cm,
        weight_kg,
        activity_level,
        goal_type,
        daily_calorie_goal,
        ..
    } = user;
    println!("[{id}] {username}");
    println!("  {gender}, born {birthdate}, {height_cm:.0} cm, {weight_kg:.1} kg");
    println!(
        "  Activity: {activity_level}  Goal: {goal_type}  Target: {daily_calorie_goal} kcal/day"
    );
}

pub(crate) fn cmd_user_create(svc: &LedgerService, args: CreateUserArgs, json: bool) -> Result<()> {
    let birthdate = NaiveDate::parse_from_str(&args.birthdate, "%Y-%m-%d")
        .with_context(|| format!("Invalid birthdate '{}'. Use YYYY-MM-DD", args.birthdate))?;
    let goal_type = GoalType::parse(&args.goal)?;

    let user = svc.create_user(&NewUser {
        username: args.username,
        gender: args.gender,
        birthdate,
        height_cm: args.height_cm,
        weight_kg: args.weight_kg,
        activity_level: args.activity,
        goal_type,
        daily_calorie_goal: args.calories,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else {
        println!("Created user:");
        print_user(&user);
    }
    Ok(())
}

pub(crate) fn cmd_user_show(svc: &LedgerService, id: i64, json: bool) -> Result<()> {
    let user = svc.get_user(id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else {
        print_user(&user);
    }
    Ok(())
}

pub(crate) fn cmd_user_delete(svc: &LedgerService, id: i64, json: bool) -> Result<()> {
    svc.delete_user(id)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted user {id} and all of their entries");
    }
    Ok(())
}

pub(crate) fn cmd_user_metrics(
    svc: &LedgerService,
    id: i64,
    weight: Option<f64>,
    height: Option<f64>,
    activity: Option<&str>,
    json: bool,
) -> Result<()> {
    let user = svc.update_body_metrics(id, weight, height, activity)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else {
        print_user(&user);
        eprintln!("Calorie goal unchanged. Run `bite goals recalc {id}` to re-estimate it.");
    }
    Ok(())
}
