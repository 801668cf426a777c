mod common;

use anyhow::Result;

use timesheet::authz::{IdentityDirectory, TeamDirectory};
use timesheet::db::{CategoryStore, TeamStore, UserDirectory};
use timesheet::errors::AppError;
use timesheet::models::team::TeamRole;
use timesheet::models::user::{UserKey, UserProfile};

#[tokio::test]
async fn team_crud_and_lookup() -> Result<()> {
    let (_dir, pool) = common::setup_pool().await?;
    let teams = TeamStore::new(pool);

    let zeta = teams.add("Zeta").await?;
    let alpha = teams.add("Alpha").await?;
    assert!(matches!(teams.add("Alpha").await, Err(AppError::Conflict(_))));
    assert!(matches!(teams.add("  ").await, Err(AppError::BadRequest(_))));

    let names: Vec<String> = teams.all().await?.into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["Alpha", "Zeta"]);

    assert_eq!(teams.team_by_id(zeta.id).await?, Some(zeta.clone()));
    assert_eq!(teams.team_by_name("Alpha").await?, Some(alpha.clone()));
    assert_eq!(teams.team_by_name("Nope").await?, None);

    assert!(teams.remove_team("Zeta").await?);
    assert!(!teams.remove_team("Zeta").await?);
    assert_eq!(teams.team_by_id(zeta.id).await?, None);

    Ok(())
}

#[tokio::test]
async fn membership_lookups_are_by_username() -> Result<()> {
    let (_dir, pool) = common::setup_pool().await?;
    let users = UserDirectory::new(pool.clone());
    let teams = TeamStore::new(pool);

    users.upsert(&UserProfile::new("k1", "ada"), false, ["staff"]).await?;
    users.upsert(&UserProfile::new("k2", "grace"), false, Vec::<String>::new()).await?;

    let core = teams.add("Core").await?;
    let docs = teams.add("Docs").await?;
    teams.add_member(&core, &UserKey::from("k1"), TeamRole::Member).await?;
    teams.add_member(&docs, &UserKey::from("k1"), TeamRole::Coordinator).await?;
    teams.add_member(&core, &UserKey::from("k2"), TeamRole::Coordinator).await?;
    // Repeated membership is a no-op.
    teams.add_member(&core, &UserKey::from("k2"), TeamRole::Coordinator).await?;

    let ada_teams = teams.teams_of_user("ada").await?;
    assert!(ada_teams.contains(&core));
    assert_eq!(ada_teams.len(), 1);

    let ada_coordinated = teams.coordinator_teams_of_user("ada").await?;
    assert!(ada_coordinated.contains(&docs));
    assert_eq!(ada_coordinated.len(), 1);

    assert!(teams.teams_of_user("grace").await?.is_empty());
    assert!(teams.teams_of_user("nobody").await?.is_empty());

    let roster = teams.roster(&core).await?;
    assert!(roster.members.contains(&UserKey::from("k1")));
    assert!(roster.coordinators.contains(&UserKey::from("k2")));
    assert_eq!(roster.coordinators.len(), 1);

    assert!(teams.remove_team("Core").await?);
    assert!(teams.teams_of_user("ada").await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn user_directory_facts() -> Result<()> {
    let (_dir, pool) = common::setup_pool().await?;
    let users = UserDirectory::new(pool);

    let ada = UserProfile::new("k1", "ada").with_display_name("Ada Lovelace");
    users.upsert(&ada, true, ["staff", "reviewers"]).await?;

    assert_eq!(users.profile_by_key(&UserKey::from("k1")).await?, Some(ada.clone()));
    assert_eq!(users.profile_by_username("ada").await?, Some(ada.clone()));
    assert!(users.is_admin(&UserKey::from("k1")).await?);
    assert!(!users.is_admin(&UserKey::from("k-missing")).await?);
    assert_eq!(users.group_names("ada").await?.len(), 2);

    // Renaming keeps the key and replaces groups.
    let renamed = UserProfile::new("k1", "ada.l");
    users.upsert(&renamed, false, ["staff"]).await?;
    assert_eq!(users.profile_by_username("ada").await?, None);
    assert_eq!(users.profile_by_key(&UserKey::from("k1")).await?.map(|p| p.username), Some("ada.l".to_string()));
    assert!(!users.is_admin(&UserKey::from("k1")).await?);
    assert!(users.group_names("ada.l").await?.contains("staff"));
    assert_eq!(users.group_names("ada.l").await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn category_crud() -> Result<()> {
    let (_dir, pool) = common::setup_pool().await?;
    let categories = CategoryStore::new(pool);

    let meeting = categories.add("Meeting").await?;
    categories.add("Coding").await?;
    assert!(matches!(categories.add("Meeting").await, Err(AppError::Conflict(_))));

    let names: Vec<String> = categories.all().await?.into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["Coding", "Meeting"]);
    assert_eq!(categories.category_by_id(meeting.id).await?, Some(meeting));

    assert!(categories.remove_category("Meeting").await?);
    let err = categories.remove_category("Meeting").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref m) if m == "No Category with this Name"));

    Ok(())
}
