use super::*;

/// Root voted and checked for an epoch with no stakes. Votes never abstain,
/// so empty windows commit to this value instead of an empty tree.
pub static EMPTY_EPOCH_ROOT: LazyLock<[u8; 32]> = LazyLock::new(|| keccak256(&[0; 32]));

pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
  Keccak256::digest(bytes).into()
}

/// Merkle tree in array form: `2n - 1` nodes, the `n` leaves sorted ascending
/// in the tail, every parent the hash of the sorted concatenation of its
/// children. Sorting on both levels makes proofs position-free.
#[derive(Debug)]
pub struct MerkleTree {
  nodes: Vec<[u8; 32]>,
  leaves: usize,
}

impl MerkleTree {
  pub fn build(mut leaves: Vec<[u8; 32]>) -> Self {
    leaves.sort_unstable();

    let count = leaves.len();
    if count == 0 {
      return Self {
        nodes: Vec::new(),
        leaves: 0,
      };
    }

    let mut nodes = vec![[0; 32]; 2 * count - 1];
    nodes[count - 1..].copy_from_slice(&leaves);

    for index in (0..count - 1).rev() {
      nodes[index] = hash_pair(&nodes[2 * index + 1], &nodes[2 * index + 2]);
    }

    Self {
      nodes,
      leaves: count,
    }
  }

  pub fn len(&self) -> usize {
    self.leaves
  }

  pub fn is_empty(&self) -> bool {
    self.leaves == 0
  }

  pub fn root(&self) -> Option<[u8; 32]> {
    self.nodes.first().copied()
  }

  /// Sibling hashes from `leaf` up to the root. `None` if the leaf is not in
  /// the tree. A single-leaf tree proves with an empty path.
  pub fn proof(&self, leaf: &[u8; 32]) -> Option<Vec<[u8; 32]>> {
    let first = self.leaves.checked_sub(1)?;
    let mut index = first + self.nodes[first..].binary_search(leaf).ok()?;

    let mut proof = Vec::new();
    while index > 0 {
      let sibling = if index % 2 == 1 { index + 1 } else { index - 1 };
      proof.push(self.nodes[sibling]);
      index = (index - 1) / 2;
    }

    Some(proof)
  }
}

pub fn verify_proof(leaf: &[u8; 32], proof: &[[u8; 32]], root: &[u8; 32]) -> bool {
  let mut hash = *leaf;
  for sibling in proof {
    hash = hash_pair(&hash, sibling);
  }
  hash == *root
}

fn hash_pair(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
  let (low, high) = if a <= b { (a, b) } else { (b, a) };
  let mut bytes = [0; 64];
  bytes[..32].copy_from_slice(low);
  bytes[32..].copy_from_slice(high);
  keccak256(&bytes)
}
