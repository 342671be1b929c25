use crate::config::Config;
use crate::db::Store;
use crate::db::repositories::UserRepository;
use crate::models::user::Role;

pub async fn cmd_set_role(config: &Config, email: &str, role: Role) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let users = store.users();

    let Some(user) = users.get_by_email(&email.trim().to_lowercase()).await? else {
        println!("No account found for: {}", email);
        return Ok(());
    };

    if user.role == role {
        println!("{} already has the '{}' role.", user.email, role.as_str());
        return Ok(());
    }

    users.set_role(&user.id, role).await?;
    println!("✓ {} is now '{}'", user.email, role.as_str());

    Ok(())
}
