use anyhow::Context;
use threadline_api::{Comment, CommentId, ListQuery, NewComment, SortDirection, UserId};

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(short, long, env = "THREADLINE_HOST")]
    host: String,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Post a comment, printing its id
    Create {
        /// Author of the comment
        #[structopt(long)]
        user: i64,

        /// Comment this one replies to
        #[structopt(long)]
        parent: Option<CommentId>,

        text: String,
    },

    /// Print a comment and all its replies
    Tree { id: CommentId },

    /// Print one page of comments
    List {
        #[structopt(long, default_value = "")]
        search: String,

        #[structopt(long, default_value = "1")]
        page: u32,

        #[structopt(long, default_value = "10")]
        page_size: u32,

        /// "asc" or "desc"
        #[structopt(long, default_value = "asc")]
        sort: SortDirection,
    },

    /// Soft-delete a comment
    Delete { id: CommentId },
}

async fn check(resp: reqwest::Response) -> anyhow::Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.bytes().await.context("reading error response")?;
    match threadline_api::Error::parse(&body) {
        Ok(err) => Err(anyhow::Error::new(err).context(format!("server answered {status}"))),
        Err(_) => Err(anyhow::anyhow!(
            "server answered {status}: {}",
            String::from_utf8_lossy(&body)
        )),
    }
}

fn print_comments(comments: &[Comment]) -> anyhow::Result<()> {
    for c in comments {
        println!(
            "{}",
            serde_json::to_string(c).context("serializing comment")?
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt = <Opt as structopt::StructOpt>::from_args();

    let client = reqwest::Client::new();
    let comments = format!("{}/api/comments", opt.host.trim_end_matches('/'));

    match opt.cmd {
        Command::Create { user, parent, text } => {
            let c = NewComment::new(UserId(user), parent, text);
            c.validate()?;
            let id: CommentId = check(client.post(&comments).json(&c).send().await?)
                .await?
                .json()
                .await
                .context("parsing new comment id")?;
            println!("{id}");
        }
        Command::Tree { id } => {
            let tree: Vec<Comment> = check(client.get(format!("{comments}/{id}")).send().await?)
                .await?
                .json()
                .await
                .context("parsing comment tree")?;
            print_comments(&tree)?;
        }
        Command::List {
            search,
            page,
            page_size,
            sort,
        } => {
            let q = ListQuery {
                search,
                page,
                page_size,
                sort,
            };
            let page: Vec<Comment> = check(client.get(&comments).query(&q).send().await?)
                .await?
                .json()
                .await
                .context("parsing comment list")?;
            print_comments(&page)?;
        }
        Command::Delete { id } => {
            check(client.delete(format!("{comments}/{id}")).send().await?).await?;
        }
    }

    Ok(())
}
