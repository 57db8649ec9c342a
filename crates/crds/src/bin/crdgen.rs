//! Prints the HelloWorld CustomResourceDefinition as YAML.
//!
//! Usage: `cargo run -p crds --bin crdgen > config/crd/helloworld.yaml`

use crds::HelloWorld;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crd = HelloWorld::crd();
    print!("{}", serde_yaml::to_string(&crd)?);
    Ok(())
}
