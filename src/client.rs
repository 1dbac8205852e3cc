use std::io::Write;

use askama::Template;
use comfy_table::{Row, Table};
use miette::IntoDiagnostic;

use crate::{
    app::{Action, App},
    comment::Comment,
    render::CommentList,
    request::Credentials,
    Post,
};

fn prompt(message: &str) -> miette::Result<String> {
    print!("{message}");
    std::io::stdout().flush().into_diagnostic()?;
    let mut buf = String::new();
    std::io::stdin().read_line(&mut buf).into_diagnostic()?;
    Ok(buf.trim().to_owned())
}

fn comment_table(comments: &[Comment]) -> Table {
    let mut table = Table::new();
    table.set_header(Row::from(vec!["ID", "Author", "Date", "Likes", "Text"]));
    for comment in comments {
        table.add_row(Row::from(&[
            &comment.id,
            &comment.author,
            &comment.date,
            &comment.likes.to_string(),
            &comment.text,
        ]));
    }
    table
}

pub async fn list(app: App) -> miette::Result<()> {
    app.init().await?;
    println!("{}", comment_table(&app.state().await.comments));
    Ok(())
}

pub async fn render(app: App) -> miette::Result<()> {
    app.init().await?;
    let html = CommentList::new(&app.state().await.comments)
        .render()
        .into_diagnostic()?;
    println!("{html}");
    Ok(())
}

pub async fn login(app: App, login: Option<String>) -> miette::Result<()> {
    let login = match login {
        Some(l) => l,
        None => prompt("Login: ")?,
    };
    let password = prompt("Password: ")?;

    app.dispatch(Action::Login(Credentials { login, password }))
        .await?;

    if let Some(session) = app.state().await.session {
        println!("Logged in as {}", session.name);
    }
    Ok(())
}

pub async fn logout(app: App) -> miette::Result<()> {
    app.dispatch(Action::Logout).await?;
    println!("Session removed");
    Ok(())
}

pub async fn post(app: App, post: Post) -> miette::Result<()> {
    // the comment can still be posted when the list does not load
    if let Err(err) = app.init().await {
        println!("Could not load comments: {err}");
    }

    let state = app.state().await;
    if !state.is_authorized() && !state.anonymous_posting {
        println!("You need to log in before commenting.");
        let login = prompt("Login: ")?;
        let password = prompt("Password: ")?;
        app.dispatch(Action::Login(Credentials { login, password }))
            .await?;
    }

    let authorized = app.state().await.is_authorized();
    let name = match post.name {
        Some(name) => Some(name),
        None if !authorized => Some(prompt("Please enter your name: ")?),
        None => None,
    };

    app.set_draft(name, post.text).await;
    app.dispatch(Action::Submit).await?;

    let state = app.state().await;
    println!("{}", comment_table(&state.comments));
    Ok(())
}
