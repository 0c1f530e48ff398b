use crate::commands::{build_runtime, load_config, CommandResult, Session};

pub fn run(message: &str) -> CommandResult {
    let config = match load_config("ask") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("ask") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    runtime.block_on(async {
        let session = match Session::open("ask", &config).await {
            Ok(session) => session,
            Err(result) => return result,
        };
        let reply = session.dispatcher.online_query(message).await;
        session.close().await;
        CommandResult::reply("ask", reply.kind.as_str(), reply.text)
    })
}
