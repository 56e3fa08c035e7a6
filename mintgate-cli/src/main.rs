use clap::{Parser, Subcommand};
use mintgate_hash::{Digest, DIGEST_LEN};
use mintgate_spec as spec;
use mintgate_whitelist::{Address, Commitment, MembershipProof, ProofBundle, Whitelist};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(name = "mintgate", version, about = "Whitelist commitment tooling for the mintgate sale")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the root committing to a whitelist snapshot
    Root {
        #[arg(long)]
        snapshot: PathBuf,
    },
    /// Print one address's leaf and sibling path; optionally save the proof
    Proof {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        address: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write the root plus every member's proof as one bundle
    Export {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long, default_value = "proofs.bin")]
        out: PathBuf,
    },
    /// Check a saved proof against a published root
    Verify {
        /// Root hex as published on chain
        #[arg(long)]
        root: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        allowance: u64,
        #[arg(long, default_value = "proof.bin")]
        proof: PathBuf,
    },
}

fn load_commitment(path: &Path) -> (Whitelist, Commitment) {
    let txt = fs::read_to_string(path).expect("read snapshot");
    let snap = spec::load_snapshot_toml(&txt).expect("parse snapshot");
    let addresses: Vec<Address> = snap
        .addresses
        .iter()
        .map(|s| s.parse().expect("snapshot address"))
        .collect();
    let whitelist = Whitelist::from_pairs(&addresses, &snap.allowances).expect("whitelist");
    let commitment = Commitment::build(&whitelist);
    (whitelist, commitment)
}

fn parse_root(hex_root: &str) -> Digest {
    let bytes = hex::decode(hex_root.strip_prefix("0x").unwrap_or(hex_root)).expect("root hex");
    assert_eq!(bytes.len(), DIGEST_LEN, "root must be {} bytes", DIGEST_LEN);
    let mut root = [0u8; DIGEST_LEN];
    root.copy_from_slice(&bytes);
    root
}

fn main() {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Root { snapshot } => {
            let (_, commitment) = load_commitment(&snapshot);
            println!("0x{}", hex::encode(commitment.root()));
        }
        Cmd::Proof { snapshot, address, out } => {
            let (_, commitment) = load_commitment(&snapshot);
            let addr: Address = address.parse().expect("address");
            match commitment.membership(&addr) {
                Some(proof) => {
                    println!("leaf=0x{}", hex::encode(proof.leaf));
                    for sibling in &proof.path {
                        println!("0x{}", hex::encode(sibling));
                    }
                    if let Some(out) = out {
                        let mut f = fs::File::create(&out).expect("create");
                        bincode::serialize_into(&mut f, &proof).expect("encode");
                        println!("wrote {}", out.display());
                    }
                }
                None => println!("{} is not whitelisted", addr),
            }
        }
        Cmd::Export { snapshot, out } => {
            let (whitelist, commitment) = load_commitment(&snapshot);
            let bundle = ProofBundle::build(&whitelist, &commitment);
            let mut f = fs::File::create(&out).expect("create");
            bincode::serialize_into(&mut f, &bundle).expect("encode");
            println!(
                "wrote {} ({} proofs, root=0x{})",
                out.display(),
                bundle.entries.len(),
                hex::encode(bundle.root)
            );
        }
        Cmd::Verify { root, address, allowance, proof } => {
            let root = parse_root(&root);
            let addr: Address = address.parse().expect("address");
            let f = fs::File::open(&proof).expect("open");
            let proof: MembershipProof = bincode::deserialize_from(f).expect("decode");
            let ok = proof.verify(&root, &addr, allowance);
            println!("{}", if ok { "valid" } else { "invalid" });
        }
    }
}
