use sqlx::SqlitePool;

use crate::models::NewUser;
use crate::store::users;

/// Insert a user directly and print the invite code it signs in with.
pub async fn create_user(pool: &SqlitePool, name: &str, email: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = pool.acquire().await?;

    if crate::store::is_taken(&mut conn, "users", "email", email, None).await? {
        return Err(format!("A user with email '{}' already exists", email).into());
    }

    let user = users::create(&mut conn, &NewUser::new(name.to_string(), email.to_string())).await?;

    println!("Created user:");
    println!("  ID: {}", user.id);
    println!("  Name: {}", user.name);
    println!("  Email: {}", user.email);
    println!("  Invite Code: {}", user.invite_code);

    Ok(())
}
