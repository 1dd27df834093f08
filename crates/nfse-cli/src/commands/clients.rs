//! Clients command - list configured clients and their category rules.

use console::style;

use super::load_config;

pub async fn run(config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    if config.clients.is_empty() {
        println!("{} No clients configured.", style("ℹ").blue());
        return Ok(());
    }

    for client in &config.clients {
        println!(
            "{} {}",
            style(&client.name).bold(),
            style(format!(
                "({})",
                config.client_template_dir(&client.name).display()
            ))
            .dim()
        );

        // Rules are checked in this order; the first match wins.
        for (i, rule) in client.categories.rules().iter().enumerate() {
            println!(
                "  {:>2}. {:<32} {}",
                i + 1,
                rule.category,
                rule.keywords.join(" + ")
            );
        }
        println!();
    }

    Ok(())
}
