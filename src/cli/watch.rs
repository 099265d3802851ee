use super::ui;
use crate::context::AppContext;
use crate::core::currency::Currency;
use crate::core::wallet::WalletError;
use anyhow::{Context, Result};
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;

/// One line of interactive input.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Amount(String),
    Base(Currency),
    Wallet,
    Quit,
    Unknown(String),
}

pub fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let input = match line.to_ascii_lowercase().as_str() {
        "quit" | "exit" | "q" => Input::Quit,
        "wallet" | "w" => Input::Wallet,
        _ => {
            if let Ok(currency) = line.parse::<Currency>() {
                Input::Base(currency)
            } else if line.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'))
            {
                Input::Amount(line.to_string())
            } else {
                Input::Unknown(line.to_string())
            }
        }
    };
    Some(input)
}

fn print_help() {
    let symbols: Vec<&str> = Currency::ALL.iter().map(|c| c.code()).collect();
    println!(
        "{}",
        ui::style_text(
            &format!(
                "Type an amount, a currency ({}), 'wallet' or 'quit'.",
                symbols.join(", ")
            ),
            ui::StyleType::Subtle
        )
    );
}

fn print_wallet(context: &AppContext) {
    match context.wallet.error_message() {
        Some(message) => println!("{}", ui::style_text(message, ui::StyleType::Error)),
        None => println!(
            "Wallet: {}",
            ui::style_text(&context.wallet.label(), ui::StyleType::Label)
        ),
    }
}

type AccountRequest = BoxFuture<'static, Result<Vec<String>, WalletError>>;

/// Reads commands until `quit` or end of input, printing the table each
/// time a new view is published. A wallet request keeps running alongside
/// input; it is awaited before returning.
pub async fn run(context: &mut AppContext) -> Result<()> {
    run_with_reader(context, BufReader::new(tokio::io::stdin())).await
}

pub async fn run_with_reader<R>(context: &mut AppContext, reader: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut updates = context.converter.subscribe();
    let mut lines = reader.lines();
    let mut wallet_request: Option<AccountRequest> = None;

    print_help();
    print_wallet(context);
    println!("{}", updates.borrow_and_update().display_as_table());

    loop {
        tokio::select! {
            biased;

            accounts = async {
                match wallet_request.as_mut() {
                    Some(request) => request.await,
                    None => std::future::pending().await,
                }
            }, if wallet_request.is_some() => {
                wallet_request = None;
                context.wallet.finish_connect(accounts);
                print_wallet(context);
            }
            changed = updates.changed() => {
                changed.context("Converter session closed")?;
                println!("{}", updates.borrow_and_update().display_as_table());
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    debug!("Input closed");
                    break;
                };
                match parse_input(&line) {
                    None => {}
                    Some(Input::Quit) => break,
                    Some(Input::Amount(amount)) => context.converter.set_amount(amount).await,
                    Some(Input::Base(base)) => context.converter.set_base(base).await,
                    Some(Input::Wallet) => {
                        if let Some(request) = context.wallet.press() {
                            wallet_request = Some(request.send().boxed());
                        }
                        print_wallet(context);
                    }
                    Some(Input::Unknown(text)) => {
                        println!(
                            "{}",
                            ui::style_text(&format!("Unrecognised input: {text}"), ui::StyleType::Error)
                        );
                        print_help();
                    }
                }
            }
        }
    }

    if let Some(request) = wallet_request {
        let accounts = request.await;
        context.wallet.finish_connect(accounts);
        print_wallet(context);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("  "), None);
        assert_eq!(parse_input("2.50"), Some(Input::Amount("2.50".to_string())));
        assert_eq!(parse_input(".5"), Some(Input::Amount(".5".to_string())));
        assert_eq!(parse_input("eth"), Some(Input::Base(Currency::Eth)));
        assert_eq!(parse_input("Wallet"), Some(Input::Wallet));
        assert_eq!(parse_input("quit"), Some(Input::Quit));
        assert_eq!(parse_input("doge"), Some(Input::Unknown("doge".to_string())));
    }
}
