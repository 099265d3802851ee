use super::ui;
use crate::context::AppContext;
use anyhow::Result;

/// Presses the wallet button once unless an account is already connected,
/// then prints the button label or the failure message.
pub async fn run(context: &mut AppContext) -> Result<()> {
    if let Some(request) = context.wallet.begin_connect() {
        let spinner = ui::new_spinner(&context.wallet.label());
        let accounts = request.send().await;
        spinner.finish_and_clear();
        context.wallet.finish_connect(accounts);
    }

    match context.wallet.error_message() {
        Some(message) => println!("{}", ui::style_text(message, ui::StyleType::Error)),
        None if context.wallet.is_connected() => println!(
            "{} {}",
            ui::style_text("●", ui::StyleType::Success),
            ui::style_text(&context.wallet.label(), ui::StyleType::Label)
        ),
        None => println!("{}", ui::style_text(&context.wallet.label(), ui::StyleType::Subtle)),
    }
    Ok(())
}
