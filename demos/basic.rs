use std::time::Duration;

use restwire::{Json, RestClient};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct Post {
    id: u64,
    title: String,
}

#[derive(Serialize)]
struct NewPost<'a> {
    title: &'a str,
    body: &'a str,
    #[serde(rename = "userId")]
    user_id: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let base_url = std::env::var("RESTWIRE_BASE_URL")
        .unwrap_or_else(|_| "https://jsonplaceholder.typicode.com".to_owned());

    let client = RestClient::builder()
        .base_url(base_url)
        .header("Accept", "application/json")
        .timeout(Duration::from_secs(10))
        .max_retries(2)
        .backoff(Duration::from_millis(200))
        .logger(|args: std::fmt::Arguments<'_>| eprintln!("{args}"))
        .build()?;

    let post = client
        .get::<Json<Post>>(None, "/posts/1", None)
        .await?
        .into_json();
    println!("fetched #{}: {}", post.id, post.title);

    let created = client
        .post::<_, Json<Post>>(
            None,
            "/posts",
            &NewPost {
                title: "hello",
                body: "from restwire",
                user_id: 1,
            },
            None,
        )
        .await?;
    println!(
        "created #{} (status {})",
        created.output.id, created.response.status
    );

    Ok(())
}
