//! Interactive tour of the library over the bundled in-memory services.
//!
//! Sessions, search, and ratings all run for real; only the backends are
//! local. Ratings persist to the store file between runs.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use cinelog::{
    InMemoryCatalog, InMemoryKv, InMemoryProvider, MovieCatalog, ProfilePatch, RatingBook,
    SessionManager,
};

pub async fn run(store_path: &Path) -> cinelog::Result<()> {
    let provider = Arc::new(InMemoryProvider::new());
    provider.add_account("demo@cinelog.app", "demo-pass", "Demo")?;

    let catalog = Arc::new(InMemoryCatalog::sample());
    let kv = match InMemoryKv::load_from_file(store_path) {
        Ok(kv) => {
            tracing::info!("Loaded store from {}", store_path.display());
            Arc::new(kv)
        }
        Err(e) => {
            tracing::warn!("Failed to load store: {e:?}. Starting fresh.");
            Arc::new(InMemoryKv::new())
        }
    };
    let ratings = RatingBook::new(kv.clone());

    let sessions = SessionManager::new(provider.clone());
    sessions.start();
    sessions.hydrate().await;

    // Mirror session changes the way a front end would.
    let mut updates = sessions.subscribe();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            let line = if snapshot.is_loading {
                "[session] working...".to_string()
            } else {
                match snapshot.user() {
                    Some(user) => format!("[session] signed in as {} <{}>", user.name, user.email),
                    None => "[session] signed out".to_string(),
                }
            };
            println!("{line}");
        }
    });

    println!("cinelog demo; account demo@cinelog.app / demo-pass is preloaded");
    println!("type `help` for commands");

    loop {
        print!("> ");
        std::io::stdout().flush().ok();
        let Some(line) = read_line().await else {
            break;
        };
        let line = line.trim().to_string();
        let mut parts = line.split_whitespace();
        let rest = |n: usize| -> String {
            line.splitn(n + 1, char::is_whitespace)
                .nth(n)
                .unwrap_or("")
                .trim()
                .to_string()
        };

        match parts.next().unwrap_or("") {
            "" => {}
            "help" => print_help(),
            "register" => {
                let (Some(name), Some(email), Some(password)) =
                    (parts.next(), parts.next(), parts.next())
                else {
                    println!("usage: register <name> <email> <password>");
                    continue;
                };
                match sessions.register(name, email, password, None).await {
                    Ok(user) => println!("registered {} ({})", user.name, user.id),
                    Err(e) => println!("error: {e}"),
                }
            }
            "login" => {
                let (Some(email), Some(password)) = (parts.next(), parts.next()) else {
                    println!("usage: login <email> <password>");
                    continue;
                };
                match sessions.login(email, password).await {
                    Ok(user) => println!("welcome back, {}", user.name),
                    Err(e) => println!("error: {e}"),
                }
            }
            "logout" => {
                if let Err(e) = sessions.logout().await {
                    println!("error: {e}");
                }
            }
            "whoami" => match sessions.current_user() {
                Some(user) => println!("{} <{}> id={}", user.name, user.email, user.id),
                None => println!("not signed in"),
            },
            "rename" => {
                let name = rest(1);
                if name.is_empty() {
                    println!("usage: rename <new name>");
                    continue;
                }
                match sessions.update_profile(ProfilePatch::rename(name)).await {
                    Ok(user) => println!("now known as {}", user.name),
                    Err(e) => println!("error: {e}"),
                }
            }
            "search" => {
                let query = rest(1);
                match catalog.search(&query, 1).await {
                    Ok(page) => {
                        for movie in &page.movies {
                            let year = movie
                                .year
                                .map(|y| y.to_string())
                                .unwrap_or_else(|| "----".to_string());
                            println!("{:>8}  {}  {}", movie.id, year, movie.title);
                        }
                        println!("page {} of {}", page.page, page.total_pages);
                    }
                    Err(e) => println!("error: {e}"),
                }
            }
            "details" => {
                let Some(id) = parts.next() else {
                    println!("usage: details <movie-id>");
                    continue;
                };
                match catalog.details(id).await {
                    Ok(movie) => {
                        println!("{} ({})", movie.title, movie.release_date.as_deref().unwrap_or("?"));
                        println!("  genres: {}", movie.genres.join(", "));
                        println!("  rating: {:.1}/10", movie.vote_average);
                    }
                    Err(e) => println!("error: {e}"),
                }
            }
            "rate" => {
                let (Some(id), Some(score)) = (parts.next(), parts.next()) else {
                    println!("usage: rate <movie-id> <1-5>");
                    continue;
                };
                let Some(user) = sessions.current_user() else {
                    println!("sign in first");
                    continue;
                };
                let Ok(score) = score.parse::<u8>() else {
                    println!("score must be a number from 1 to 5");
                    continue;
                };
                let result = catalog.details(id).await.and_then(|movie| {
                    ratings.rate(
                        &user.id,
                        &movie.id,
                        &movie.title,
                        movie.poster_url.as_deref(),
                        score,
                    )
                });
                match result {
                    Ok(rating) => {
                        println!("rated {} {}/5", rating.title, rating.score);
                        kv.save_to_file(store_path)?;
                    }
                    Err(e) => println!("error: {e}"),
                }
            }
            "ratings" => {
                let Some(user) = sessions.current_user() else {
                    println!("sign in first");
                    continue;
                };
                let list = ratings.list(&user.id)?;
                if list.is_empty() {
                    println!("no ratings yet");
                }
                for rating in list {
                    println!("{}/5  {}", rating.score, rating.title);
                }
            }
            "unrate" => {
                let Some(id) = parts.next() else {
                    println!("usage: unrate <movie-id>");
                    continue;
                };
                let Some(user) = sessions.current_user() else {
                    println!("sign in first");
                    continue;
                };
                if ratings.remove(&user.id, id)? {
                    println!("rating removed");
                    kv.save_to_file(store_path)?;
                } else {
                    println!("nothing to remove");
                }
            }
            "quit" | "exit" => break,
            other => println!("unknown command `{other}`; type `help`"),
        }
    }

    match kv.save_to_file(store_path) {
        Ok(()) => tracing::info!("Store saved to {}", store_path.display()),
        Err(e) => tracing::error!("Failed to save store: {e:?}"),
    }
    sessions.shutdown().await;
    println!("bye");
    Ok(())
}

fn print_help() {
    println!("  register <name> <email> <password>");
    println!("  login <email> <password>");
    println!("  logout");
    println!("  whoami");
    println!("  rename <new name>");
    println!("  search <query>");
    println!("  details <movie-id>");
    println!("  rate <movie-id> <1-5>");
    println!("  ratings");
    println!("  unrate <movie-id>");
    println!("  quit");
}

async fn read_line() -> Option<String> {
    tokio::task::spawn_blocking(|| {
        let mut buffer = String::new();
        match std::io::stdin().read_line(&mut buffer) {
            Ok(0) => None,
            Ok(_) => Some(buffer),
            Err(_) => None,
        }
    })
    .await
    .ok()
    .flatten()
}
