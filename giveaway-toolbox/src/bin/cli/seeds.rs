use color_eyre::Report;
use fair_draw_lib::seed::{generate_client_seed, generate_server_seed};
use fair_draw_lib::NonceSequence;
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub struct Seeds {
    /// Also generate a server seed and nonce, for draws resolved outside this tool
    #[structopt(long)]
    server: bool,
}

impl Seeds {
    pub fn exec(self) -> Result<(), Report> {
        let mut rng = rand::thread_rng();
        println!("client_seed: {}", generate_client_seed(&mut rng));
        if self.server {
            println!("server_seed: {}", generate_server_seed(&mut rng));
            println!("nonce: {}", NonceSequence::default().next_nonce());
        }
        Ok(())
    }
}
