//! Operator commands: replica and training management from the terminal.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};
use colored::*;
use dialoguer::{theme::ColorfulTheme, Confirm, Select};
use tracing::info;

use fitconnect_core::replica::{self, text_with_source, train_text, ClientConfig};
use fitconnect_core::training::{self, CONTENT_LIMIT};
use fitconnect_core::{Config, Language, Replica, SensayClient, TrainingUpdate};

const DEFAULT_EDIT_FILE: &str = "initial.txt";

/// Extensions sent as raw text; anything else goes through a signed file upload.
const TEXT_EXTENSIONS: [&str; 3] = ["txt", "md", "csv"];

fn client(config: &Config) -> Result<SensayClient> {
    SensayClient::from_config(config)
}

fn print_replica_line(replica: &Replica) {
    println!(
        "{}  {}  {}",
        replica.uuid.dimmed(),
        replica.name.bold().yellow(),
        replica.slug.as_deref().unwrap_or("-").cyan()
    );
}

pub async fn create(config: &Config, output: &Path) -> Result<()> {
    let client = client(config)?;
    let mut definition = replica::default_replica();
    definition.owner_id = config.owner_id.clone();

    println!("{}", format!("Creating replica {}...", definition.name).bold().blue());
    let provisioned =
        replica::provision(&client, &definition, &config.training_dir, output).await?;

    println!("{} {}", "Replica created:".green(), provisioned.client_config.uuid.bold());
    match provisioned.training_id {
        Some(id) => println!("{} entry {}", "Training uploaded:".green(), id),
        None => println!(
            "{}",
            format!(
                "No training file at {}, replica left untrained",
                config.training_dir.join(&definition.training_file).display()
            )
            .yellow()
        ),
    }
    println!("Client config written to {}", output.display().to_string().cyan());
    println!(
        "\nSet {} to start chatting with it.",
        format!("REPLICA_UUID={}", provisioned.client_config.uuid).bold()
    );
    Ok(())
}

/// Show the replica named by the saved client config, or by `REPLICA_UUID`.
pub async fn info(config: &Config, client_config: &Path) -> Result<()> {
    let uuid = match ClientConfig::load(client_config) {
        Ok(saved) => {
            println!(
                "{} {} (created {})",
                "Client config:".dimmed(),
                saved.name.bold(),
                saved.created_at.format("%d/%m/%Y %H:%M")
            );
            saved.uuid
        }
        Err(_) => config.replica_uuid()?.to_string(),
    };
    details(config, &uuid).await
}

pub async fn list(config: &Config) -> Result<()> {
    let replicas = client(config)?.list_replicas(&config.owner_id).await?;

    if replicas.is_empty() {
        println!("{}", "No replicas found".red());
        return Ok(());
    }

    println!("\n{} replicas:\n", replicas.len().to_string().bold().green());
    for replica in &replicas {
        print_replica_line(replica);
    }
    Ok(())
}

pub async fn details(config: &Config, uuid: &str) -> Result<()> {
    let replica = client(config)?.get_replica(uuid).await?;

    println!("\n{}", replica.name.bold().green());
    println!("{}", "=".repeat(50).dimmed());
    println!("{:<14} {}", "UUID:".bold(), replica.uuid);
    if let Some(slug) = &replica.slug {
        println!("{:<14} {}", "Slug:".bold(), slug);
    }
    if let Some(kind) = &replica.kind {
        println!("{:<14} {}", "Type:".bold(), kind);
    }
    if let Some(owner) = &replica.owner_id {
        println!("{:<14} {}", "Owner:".bold(), owner);
    }
    if !replica.tags.is_empty() {
        println!("{:<14} {}", "Tags:".bold(), replica.tags.join(", "));
    }
    if let Some(description) = &replica.short_description {
        println!("{:<14} {}", "Description:".bold(), description);
    }
    if let Some(greeting) = &replica.greeting {
        println!("\n{}\n{}", "Greeting:".bold(), greeting);
    }
    println!("{}", "=".repeat(50).dimmed());
    Ok(())
}

fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

pub async fn delete(config: &Config, uuid: &str, assume_yes: bool) -> Result<()> {
    if !confirm(&format!("Delete replica {}?", uuid), assume_yes)? {
        println!("{}", "Cancelled".yellow());
        return Ok(());
    }
    client(config)?.delete_replica(uuid).await?;
    println!("{} {}", "Deleted replica".green(), uuid.bold());
    Ok(())
}

pub async fn upload(
    config: &Config,
    replica_uuid: Option<String>,
    file: Option<PathBuf>,
    text: Option<String>,
) -> Result<()> {
    let client = client(config)?;
    let uuid = match replica_uuid {
        Some(uuid) => uuid,
        None => config.replica_uuid()?.to_string(),
    };

    match (file, text) {
        (Some(path), None) => upload_file(&client, &uuid, &path).await,
        (None, Some(text)) => {
            if text.trim().is_empty() {
                bail!("training text is empty");
            }
            let id = train_text(&client, &uuid, &TrainingUpdate::raw(text), None).await?;
            println!("{} entry {}", "Training text uploaded:".green(), id);
            Ok(())
        }
        _ => Err(anyhow!("pass exactly one of --file or --text")),
    }
}

async fn upload_file(client: &SensayClient, uuid: &str, path: &Path) -> Result<()> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("invalid file name: {}", path.display()))?;
    let is_text = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| TEXT_EXTENSIONS.contains(&e.to_lowercase().as_str()));

    if is_text {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let update = text_with_source(&content, "file_upload", filename);
        let id = train_text(client, uuid, &update, None).await?;
        println!("{} {} (entry {})", "Uploaded".green(), filename.bold(), id);
    } else {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let size = bytes.len();
        let url = client.training_upload_url(uuid, filename).await?;
        client.upload_signed(&url, bytes).await?;
        info!(replica_uuid = uuid, filename, size, "training file uploaded");
        println!(
            "{} {} ({})",
            "Uploaded".green(),
            filename.bold(),
            training::format_size(size as u64)
        );
    }
    Ok(())
}

pub fn files(config: &Config) -> Result<()> {
    let files = training::list_training_files(&config.training_dir)?;

    if files.is_empty() {
        println!(
            "{}",
            format!("No training files in {}", config.training_dir.display()).red()
        );
        return Ok(());
    }

    for file in &files {
        println!(
            "{:<30} {:>12}  {}",
            file.name.bold(),
            file.size,
            file.modified.dimmed()
        );
    }
    Ok(())
}

/// Open a training file in `$EDITOR`, creating it first when missing.
pub fn edit_file(config: &Config, name: Option<String>) -> Result<()> {
    let name = name.unwrap_or_else(|| DEFAULT_EDIT_FILE.to_string());
    let path = training::resolve_in(&config.training_dir, &name)?;
    if !path.exists() {
        training::write_training_file(&config.training_dir, &name, "")?;
        println!("{} {}", "Created".green(), path.display());
    }

    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let status = Command::new(&editor)
        .arg(&path)
        .status()
        .with_context(|| format!("launching {}", editor))?;
    if !status.success() {
        bail!("{} exited with {}", editor, status);
    }
    println!("{} {}", "Saved".green(), path.display());
    Ok(())
}

pub async fn content(config: &Config, replica_uuid: Option<&str>) -> Result<()> {
    let items = client(config)?.list_training(CONTENT_LIMIT).await?;
    let content = training::group_training(items, replica_uuid);

    if content.total_items == 0 {
        println!("{}", "No training content found".red());
        return Ok(());
    }

    for group in &content.groups {
        println!("\n{} {}", "Replica".bold().blue(), group.replica_uuid.bold());
        for item in &group.items {
            let label = item.filename.as_deref().unwrap_or(item.kind.as_str());
            println!(
                "  {} {} {}",
                format!("#{}", item.id).yellow(),
                label,
                format!("[{}]", item.status).dimmed()
            );
            if let Some(text) = item.raw_text.as_deref().or(item.processed_text.as_deref()) {
                println!("     {}", text.replace('\n', " ").dimmed());
            }
        }
    }
    println!("\n{} entries", content.total_items.to_string().bold());
    Ok(())
}

pub async fn delete_content(config: &Config, id: i64, assume_yes: bool) -> Result<()> {
    if !confirm(&format!("Delete training entry {}?", id), assume_yes)? {
        println!("{}", "Cancelled".yellow());
        return Ok(());
    }
    client(config)?.delete_training(id).await?;
    println!("{} {}", "Deleted training entry".green(), id);
    Ok(())
}

fn parse_language(code: &str) -> Result<Language> {
    Language::from_str(code).ok_or_else(|| {
        let known: Vec<&str> = Language::all().iter().map(|l| l.as_str()).collect();
        anyhow!("unknown language '{}' (expected one of: {})", code, known.join(", "))
    })
}

/// Save the chat language, asking with a picker when no code is given.
pub fn set_language(config: &Config, code: Option<String>) -> Result<()> {
    let language = match code {
        Some(code) => parse_language(&code)?,
        None => {
            let languages = Language::all();
            let names: Vec<&str> = languages.iter().map(|l| l.display_name()).collect();
            let current = languages
                .iter()
                .position(|l| *l == config.language())
                .unwrap_or(0);
            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("Chat language")
                .items(&names)
                .default(current)
                .interact()?;
            languages[selection]
        }
    };

    let path = Config::save_language(language)?;
    println!(
        "{} {} ({})",
        "Chat language set to".green(),
        language.display_name().bold(),
        path.display().to_string().dimmed()
    );
    Ok(())
}

pub fn check_config(config: &Config) -> bool {
    let missing = config.validate();
    println!("{:<16} {}", "API:".bold(), config.api_url);
    println!("{:<16} {}", "API version:".bold(), config.api_version);
    println!(
        "{:<16} {}",
        "Replica:".bold(),
        config.replica_uuid.as_deref().unwrap_or("-")
    );
    println!("{:<16} {}", "Training dir:".bold(), config.training_dir.display());
    println!("{:<16} {}", "Language:".bold(), config.language().display_name());
    println!(
        "{:<16} {}",
        "Admin auth:".bold(),
        if config.admin_password.is_some() { "on" } else { "off" }
    );

    if missing.is_empty() {
        println!("\n{}", "Configuration OK".green().bold());
        true
    } else {
        println!("\n{}", "Missing settings:".red().bold());
        for key in missing {
            println!("  {}", key.red());
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, training_dir: &Path) -> Config {
        let mut config = Config::new();
        config.api_url = server.uri();
        config.org_secret = Some("secret".into());
        config.replica_uuid = Some("rep-1".into());
        config.training_dir = training_dir.to_path_buf();
        config
    }

    #[tokio::test]
    async fn upload_text_file_is_tagged_with_its_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/replicas/rep-1/training"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"knowledgeBaseID": 7})))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/v1/replicas/rep-1/training/7"))
            .and(body_partial_json(json!({
                "rawText": "FAQ body",
                "metadata": {"source": "faq.md", "type": "file_upload"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("faq.md");
        fs::write(&file, "FAQ body").unwrap();

        let config = config_for(&server, tmp.path());
        upload(&config, None, Some(file), None).await.unwrap();
    }

    #[tokio::test]
    async fn upload_binary_file_goes_through_signed_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/replicas/rep-1/training/files/upload"))
            .and(query_param("filename", "guide.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "signedURL": format!("{}/signed/guide.pdf", server.uri())
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/signed/guide.pdf"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("guide.pdf");
        fs::write(&file, [0u8, 1, 2]).unwrap();

        let config = config_for(&server, tmp.path());
        upload(&config, None, Some(file), None).await.unwrap();
    }

    #[tokio::test]
    async fn upload_needs_exactly_one_source() {
        let server = MockServer::start().await;
        let tmp = tempfile::tempdir().unwrap();
        let config = config_for(&server, tmp.path());

        assert!(upload(&config, None, None, None).await.is_err());
        assert!(upload(&config, None, None, Some("  ".into())).await.is_err());
    }

    #[tokio::test]
    async fn delete_content_with_yes_skips_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/training/12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let config = config_for(&server, tmp.path());
        delete_content(&config, 12, true).await.unwrap();
    }

    #[test]
    fn language_codes_are_validated() {
        assert_eq!(parse_language("pt").unwrap(), Language::Portuguese);
        assert_eq!(parse_language("English").unwrap(), Language::English);
        let err = parse_language("fr").unwrap_err().to_string();
        assert!(err.contains("en, pt"));
    }

    #[test]
    fn check_config_reports_missing_settings() {
        assert!(!check_config(&Config::new()));

        let mut config = Config::new();
        config.org_secret = Some("s".into());
        config.replica_uuid = Some("r".into());
        assert!(check_config(&config));
    }
}
